//! The entitlement-changed signal.
//!
//! A single event shape broadcast after every entitlement mutation so
//! feature guards, header badges, and other open views re-read the access
//! decision instead of polling.

use serde::{Deserialize, Serialize};

use crate::ids::AccountEmail;
use crate::plan::PlanId;

/// Payload of the process-wide entitlement-changed signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementChanged {
    /// The affected account.
    pub account_email: AccountEmail,

    /// Whether the account holds an active entitlement after the change.
    pub active: bool,

    /// Set when the change was a lazy trial expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_expired: Option<bool>,

    /// The plan involved, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanId>,
}

impl EntitlementChanged {
    /// A new entitlement (trial or paid) was activated.
    #[must_use]
    pub fn activated(account_email: AccountEmail, plan: PlanId) -> Self {
        Self {
            account_email,
            active: true,
            trial_expired: None,
            plan: Some(plan),
        }
    }

    /// The active entitlement was cancelled.
    #[must_use]
    pub fn cancelled(account_email: AccountEmail, plan: PlanId) -> Self {
        Self {
            account_email,
            active: false,
            trial_expired: None,
            plan: Some(plan),
        }
    }

    /// A trial was lazily expired.
    #[must_use]
    pub fn trial_expired(account_email: AccountEmail, plan: PlanId) -> Self {
        Self {
            account_email,
            active: false,
            trial_expired: Some(true),
            plan: Some(plan),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_payload_shape() {
        let event = EntitlementChanged::trial_expired(
            AccountEmail::new("a@x.com").unwrap(),
            PlanId::HandymanBasic,
        );
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["account_email"], "a@x.com");
        assert_eq!(json["active"], false);
        assert_eq!(json["trial_expired"], true);
        assert_eq!(json["plan"], "handyman-basic");
    }

    #[test]
    fn activation_payload_omits_expiry_flag() {
        let event = EntitlementChanged::activated(
            AccountEmail::new("a@x.com").unwrap(),
            PlanId::ClientPro,
        );
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["active"], true);
        assert!(json.get("trial_expired").is_none());
    }
}
