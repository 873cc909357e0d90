//! Cancellation and entitlement history handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kazi_core::{Entitlement, EntitlementChanged, EntitlementId, PaymentMethod, PlanId};

use crate::auth::CurrentAccount;
use crate::error::ApiError;
use crate::state::AppState;

/// Cancellation request body.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    /// Must be `true`; cancellation is immediate and has no grace period.
    #[serde(default)]
    pub confirm: bool,
}

/// Cancellation response.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// The plan that was cancelled.
    pub plan: PlanId,
    /// User-facing message.
    pub message: String,
}

/// Cancel the account's current active entitlement.
///
/// Requires explicit confirmation. Unlike trial expiry there is no window:
/// access ends with this request. No refunds; settlement is simulated.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    account: CurrentAccount,
    Json(body): Json<CancelRequest>,
) -> Result<Json<CancelResponse>, ApiError> {
    if !body.confirm {
        return Err(ApiError::BadRequest(
            "cancellation requires explicit confirmation".into(),
        ));
    }

    let cancelled = state
        .store
        .cancel_entitlement(&account.email)?
        .ok_or_else(|| ApiError::NotFound("no active subscription".into()))?;

    tracing::info!(account = %account.email, plan = %cancelled.plan_id, "subscription cancelled");
    state.events.publish(EntitlementChanged::cancelled(
        account.email.clone(),
        cancelled.plan_id,
    ));

    Ok(Json(CancelResponse {
        plan: cancelled.plan_id,
        message: format!(
            "Your {} subscription has been cancelled",
            cancelled.plan_id.plan().title
        ),
    }))
}

/// One row of the entitlement audit history.
#[derive(Debug, Serialize)]
pub struct HistoryRow {
    /// Record id.
    pub id: EntitlementId,
    /// The plan.
    pub plan: PlanId,
    /// Whether the record currently grants access.
    pub active: bool,
    /// Whether it was a trial.
    pub is_trial: bool,
    /// Activation time.
    pub since: DateTime<Utc>,
    /// Trial cutoff, for trials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_end: Option<DateTime<Utc>>,
    /// Lazy-expiry stamp, when the trial ran out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<DateTime<Utc>>,
    /// Payment method, for paid records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<PaymentMethod>,
}

impl From<Entitlement> for HistoryRow {
    fn from(record: Entitlement) -> Self {
        Self {
            id: record.id,
            plan: record.plan_id,
            active: record.active,
            is_trial: record.is_trial,
            since: record.since,
            trial_end: record.trial_end,
            expired_at: record.expired_at,
            method: record.method,
        }
    }
}

/// History response.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Records, newest first.
    pub entitlements: Vec<HistoryRow>,
}

/// List the account's entitlement history (newest first).
pub async fn history(
    State(state): State<Arc<AppState>>,
    account: CurrentAccount,
) -> Result<Json<HistoryResponse>, ApiError> {
    let entitlements = state
        .store
        .list_entitlements(&account.email)?
        .into_iter()
        .map(HistoryRow::from)
        .collect();

    Ok(Json(HistoryResponse { entitlements }))
}
