//! Access evaluation and feature-guard handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use kazi_core::{AccessDecision, PlanId};

use crate::auth::OptionalAccount;
use crate::guard::{self, Denial, GuardMode, RequireEntitlement};
use crate::state::AppState;

/// Evaluate access for the current (possibly absent) account.
///
/// This is the raw decision consumed by header badges and dashboards; the
/// guard endpoint below wraps it with rendering affordances.
pub async fn get_access(
    State(state): State<Arc<AppState>>,
    OptionalAccount(account): OptionalAccount,
) -> Json<AccessDecision> {
    let email = account.map(|a| a.email);
    let decision = crate::access::evaluate(state.store.as_ref(), &state.events, email.as_ref());
    Json(decision)
}

/// Guard query parameters.
#[derive(Debug, Deserialize)]
pub struct GuardQuery {
    /// Requested denial rendering; defaults to the blocking modal.
    #[serde(default)]
    pub mode: GuardMode,
}

/// Guard response: either the go-ahead to render the wrapped feature, or
/// the denial affordance to render instead.
#[derive(Debug, Serialize)]
pub struct GuardResponse {
    /// The gated feature name echoed back.
    pub feature: String,

    /// Whether the wrapped feature may render.
    pub allowed: bool,

    /// The underlying decision (carries the trial countdown when granted).
    pub decision: AccessDecision,

    /// Present iff denied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denial: Option<Denial>,
}

/// Evaluate the guard for a named feature.
pub async fn guard_feature(
    State(state): State<Arc<AppState>>,
    OptionalAccount(account): OptionalAccount,
    Path(feature): Path<String>,
    Query(query): Query<GuardQuery>,
) -> Json<GuardResponse> {
    let email = account.map(|a| a.email);
    let decision = crate::access::evaluate(state.store.as_ref(), &state.events, email.as_ref());

    let denial = match &decision {
        AccessDecision::Granted { .. } => None,
        AccessDecision::Denied { reason } => Some(guard::denial(
            reason.clone(),
            &feature,
            query.mode,
            state.config.plans_url(),
        )),
    };

    Json(GuardResponse {
        allowed: decision.allowed(),
        feature,
        decision,
        denial,
    })
}

/// Payload of a successfully unlocked feature.
#[derive(Debug, Serialize)]
pub struct FeatureResponse {
    /// The feature that rendered.
    pub feature: String,

    /// The plan granting it.
    pub plan: PlanId,

    /// Days left when the grant comes from a trial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_days_left: Option<i64>,
}

/// A gated feature behind the `RequireEntitlement` extractor.
///
/// Denied requests never reach this body; the extractor rejects them with
/// the denial payload.
pub async fn premium_feature(
    Path(feature): Path<String>,
    gate: RequireEntitlement,
) -> Json<FeatureResponse> {
    Json(FeatureResponse {
        feature,
        plan: gate.subscription.plan_id,
        trial_days_left: gate.trial.map(|t| t.days_left),
    })
}
