//! Access classification.
//!
//! The pure half of the access evaluator: given the account's current
//! active record (or its absence) and the clock, decide what the caller may
//! do. The impure half (lazy expiry and event publication) lives with the
//! store, keyed off the `TrialElapsed` classification returned here.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entitlement::Entitlement;
use crate::plan::PlanId;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Why access was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum DenialReason {
    /// No authenticated account.
    NoAccount,

    /// The account has no active entitlement.
    NoSubscription,

    /// The account's trial elapsed.
    TrialExpired {
        /// The plan whose trial ran out.
        expired_plan: PlanId,
    },
}

impl DenialReason {
    /// The stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoAccount => "no_account",
            Self::NoSubscription => "no_subscription",
            Self::TrialExpired { .. } => "trial_expired",
        }
    }
}

/// Countdown state of an active trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrialStatus {
    /// Whole days remaining, rounded up.
    pub days_left: i64,

    /// The trial cutoff.
    pub trial_end: DateTime<Utc>,
}

/// The normalized access decision consumed by feature guards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "access")]
pub enum AccessDecision {
    /// Access granted.
    Granted {
        /// The granting record.
        subscription: Entitlement,

        /// Present (with the countdown) when the grant comes from a trial.
        #[serde(skip_serializing_if = "Option::is_none")]
        trial: Option<TrialStatus>,
    },

    /// Access denied.
    Denied {
        /// Why.
        #[serde(flatten)]
        reason: DenialReason,
    },
}

impl AccessDecision {
    /// Whether the gated feature may render.
    #[must_use]
    pub const fn allowed(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    /// Shorthand for a denial.
    #[must_use]
    pub const fn denied(reason: DenialReason) -> Self {
        Self::Denied { reason }
    }
}

/// What the active record means right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A paid record: access, no countdown.
    PaidActive,

    /// A trial with time left.
    TrialActive(TrialStatus),

    /// A trial at or past its cutoff; the caller must run expiry.
    TrialElapsed,
}

/// Whole days until `trial_end`, rounded up.
///
/// "0 days and 1 second left" still counts as the final day (`1`), while a
/// clock at or past the cutoff yields `<= 0`. Ceiling on the way down, zero
/// or negative as the hard cutoff: this asymmetry decides whether a user
/// sees "expires today" one last time before losing access.
#[must_use]
pub fn days_left(trial_end: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (trial_end - now).num_milliseconds();
    (millis + MILLIS_PER_DAY - 1).div_euclid(MILLIS_PER_DAY)
}

/// Classify an active record against the clock.
///
/// A trial record without a `trial_end` is malformed; it is treated as
/// already elapsed so corruption degrades to no access rather than to a
/// trial that never ends.
#[must_use]
pub fn classify(record: &Entitlement, now: DateTime<Utc>) -> Classification {
    if !record.is_trial {
        return Classification::PaidActive;
    }
    let Some(trial_end) = record.trial_end else {
        return Classification::TrialElapsed;
    };
    let days = days_left(trial_end, now);
    if days > 0 {
        Classification::TrialActive(TrialStatus {
            days_left: days,
            trial_end,
        })
    } else {
        Classification::TrialElapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlement::TRIAL_DAYS;
    use crate::ids::AccountEmail;
    use chrono::Duration;

    fn email() -> AccountEmail {
        AccountEmail::new("a@x.com").unwrap()
    }

    #[test]
    fn one_second_left_is_still_the_final_day() {
        let now = Utc::now();
        assert_eq!(days_left(now + Duration::seconds(1), now), 1);
    }

    #[test]
    fn at_or_past_the_cutoff_is_not_positive() {
        let now = Utc::now();
        assert_eq!(days_left(now, now), 0);
        assert_eq!(days_left(now - Duration::seconds(1), now), 0);
        assert_eq!(days_left(now - Duration::days(1), now), 0);
        assert!(days_left(now - Duration::days(2), now) < 0);
    }

    #[test]
    fn whole_day_boundaries_round_up() {
        let now = Utc::now();
        assert_eq!(days_left(now + Duration::days(1), now), 1);
        assert_eq!(
            days_left(now + Duration::days(1) + Duration::seconds(1), now),
            2
        );
        assert_eq!(days_left(now + Duration::days(TRIAL_DAYS), now), TRIAL_DAYS);
    }

    #[test]
    fn fresh_trial_classifies_with_full_countdown() {
        let now = Utc::now();
        let record = Entitlement::trial(email(), PlanId::HandymanBasic, now);

        let Classification::TrialActive(status) = classify(&record, now) else {
            panic!("expected an active trial");
        };
        assert_eq!(status.days_left, TRIAL_DAYS);
    }

    #[test]
    fn elapsed_trial_classifies_as_elapsed() {
        let start = Utc::now() - Duration::days(4);
        let record = Entitlement::trial(email(), PlanId::HandymanBasic, start);

        assert_eq!(classify(&record, Utc::now()), Classification::TrialElapsed);
    }

    #[test]
    fn paid_record_is_paid_regardless_of_clock() {
        let record = Entitlement::paid(
            email(),
            PlanId::ClientPro,
            crate::checkout::PaymentMethod::Card,
            Utc::now() - Duration::days(400),
        );
        assert_eq!(classify(&record, Utc::now()), Classification::PaidActive);
    }

    #[test]
    fn trial_without_cutoff_is_treated_as_elapsed() {
        let mut record = Entitlement::trial(email(), PlanId::HandymanBasic, Utc::now());
        record.trial_end = None;
        assert_eq!(classify(&record, Utc::now()), Classification::TrialElapsed);
    }

    #[test]
    fn denial_codes_are_stable() {
        assert_eq!(DenialReason::NoAccount.code(), "no_account");
        assert_eq!(DenialReason::NoSubscription.code(), "no_subscription");
        assert_eq!(
            DenialReason::TrialExpired {
                expired_plan: PlanId::HandymanBasic
            }
            .code(),
            "trial_expired"
        );
    }
}
