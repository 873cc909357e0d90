//! The feature guard.
//!
//! The reusable wrapper placed around any gated feature. It evaluates
//! access once per request and renders exactly one of: the wrapped
//! feature, a caller-supplied fallback, a denial panel, or a blocking
//! modal with a "continue without premium" escape. It never mutates
//! entitlement state itself; the evaluator owns the expiry side effect.
//!
//! Consumers re-evaluate when the event feed notifies them, not by
//! polling; the sweep task covers trials that expire while everything is
//! idle.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

use kazi_core::{AccessDecision, DenialReason, PlanId};

use crate::auth;
use crate::error::ApiError;
use crate::state::AppState;

/// How a denial should be rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardMode {
    /// The caller renders its own fallback view.
    Fallback,

    /// An inline denial panel with an upgrade action.
    Panel,

    /// A blocking overlay with an upgrade action and an escape. The
    /// default.
    #[default]
    Modal,
}

/// The denial affordance handed to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct Denial {
    /// Machine-readable reason code.
    pub code: &'static str,

    /// The full reason.
    pub reason: DenialReason,

    /// User-facing copy.
    pub message: String,

    /// Where the upgrade action points.
    pub upgrade_url: String,

    /// Render mode requested by the caller.
    pub mode: GuardMode,

    /// Escape-hatch label, present only in modal mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escape: Option<&'static str>,
}

/// Compose the user-facing denial copy for a feature.
///
/// `no_subscription` gets generic upsell copy naming the feature;
/// `trial_expired` names the expired plan explicitly.
#[must_use]
pub fn denial_message(reason: &DenialReason, feature: &str) -> String {
    match reason {
        DenialReason::NoAccount => format!("Sign in to use {feature}."),
        DenialReason::NoSubscription => {
            format!("{feature} is a premium feature. Upgrade to unlock it.")
        }
        DenialReason::TrialExpired { expired_plan } => {
            format!(
                "Your free trial of {} has ended. Subscribe to keep using {feature}.",
                plan_title(*expired_plan)
            )
        }
    }
}

fn plan_title(plan: PlanId) -> &'static str {
    plan.plan().title
}

/// Build the denial affordance for a denied decision.
#[must_use]
pub fn denial(reason: DenialReason, feature: &str, mode: GuardMode, upgrade_url: String) -> Denial {
    Denial {
        code: reason.code(),
        message: denial_message(&reason, feature),
        reason,
        upgrade_url,
        mode,
        escape: matches!(mode, GuardMode::Modal).then_some("Continue without premium"),
    }
}

/// Extractor that gates a route on an allowed access decision.
///
/// Carries the granting record and the trial countdown so the handler can
/// surface them. Rejection is a 403 with the same denial body the guard
/// endpoint renders.
#[derive(Debug, Clone)]
pub struct RequireEntitlement {
    /// The account that passed the gate.
    pub account: auth::CurrentAccount,

    /// The granting record.
    pub subscription: kazi_core::Entitlement,

    /// The countdown, when the grant comes from a trial.
    pub trial: Option<kazi_core::TrialStatus>,
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for RequireEntitlement {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let account = auth::CurrentAccount::from_request_parts(parts, state).await?;

        let decision = crate::access::evaluate(
            state.store.as_ref(),
            &state.events,
            Some(&account.email),
        );

        match decision {
            AccessDecision::Granted {
                subscription,
                trial,
            } => Ok(Self {
                account,
                subscription,
                trial,
            }),
            AccessDecision::Denied { reason } => {
                let message = denial_message(&reason, "This feature");
                Err(ApiError::AccessDenied { reason, message })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subscription_copy_names_the_feature() {
        let message = denial_message(&DenialReason::NoSubscription, "Compatibility search");
        assert!(message.contains("Compatibility search"));
        assert!(message.contains("premium"));
    }

    #[test]
    fn trial_expired_copy_names_the_plan() {
        let message = denial_message(
            &DenialReason::TrialExpired {
                expired_plan: PlanId::HandymanBasic,
            },
            "Messaging",
        );
        assert!(message.contains("Handyman Basic"));
        assert!(message.contains("Messaging"));
    }

    #[test]
    fn only_modal_mode_offers_the_escape() {
        let modal = denial(
            DenialReason::NoSubscription,
            "Messaging",
            GuardMode::Modal,
            "/premium".into(),
        );
        assert!(modal.escape.is_some());

        let panel = denial(
            DenialReason::NoSubscription,
            "Messaging",
            GuardMode::Panel,
            "/premium".into(),
        );
        assert!(panel.escape.is_none());
    }
}
