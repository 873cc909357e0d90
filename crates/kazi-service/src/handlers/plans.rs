//! Plan catalog, pricing-view preference, and trial activation handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kazi_core::{
    catalog, Audience, BillingCycle, Entitlement, EntitlementChanged, PlanId, TrialLedgerEntry,
    TRIAL_DAYS,
};

use crate::auth::{CurrentAccount, OptionalAccount};
use crate::error::ApiError;
use crate::state::AppState;

/// Cosmetic delay before the UI should redirect to the dashboard.
const REDIRECT_AFTER_MS: u64 = 1500;

/// The purchase affordances a plan card offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    /// Start the free trial (handled locally, no checkout).
    StartTrial,

    /// Subscribe via checkout.
    Subscribe,

    /// Cancel the current subscription (only on the active plan's card).
    Cancel,
}

/// One catalog entry as rendered on the pricing page.
#[derive(Debug, Serialize)]
pub struct PlanCard {
    /// Plan id.
    pub id: PlanId,
    /// Human title.
    pub title: &'static str,
    /// Monthly price in cents.
    pub monthly_price_cents: i64,
    /// Annual price in cents.
    pub annual_price_cents: i64,
    /// Who the plan is for.
    pub audience: Audience,
    /// Benefit strings in display order.
    pub benefits: &'static [&'static str],
    /// Whether this is the account's current active plan.
    pub current: bool,
    /// The actions this card offers.
    pub actions: Vec<PlanAction>,
}

/// Catalog response.
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    /// The caller's pricing-view preference.
    pub billing_cycle: BillingCycle,
    /// The plan cards.
    pub plans: Vec<PlanCard>,
}

/// List the plan catalog.
///
/// The plan matching the caller's current active entitlement gets a
/// `cancel` action instead of purchase actions.
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
    OptionalAccount(account): OptionalAccount,
) -> Result<Json<CatalogResponse>, ApiError> {
    let (current_plan, billing_cycle) = match &account {
        Some(account) => {
            let active = state.store.get_active_entitlement(&account.email)?;
            let cycle = state
                .store
                .get_billing_cycle(&account.email)?
                .unwrap_or_default();
            (active.map(|r| r.plan_id), cycle)
        }
        None => (None, BillingCycle::default()),
    };

    let plans = catalog()
        .iter()
        .map(|plan| {
            let current = current_plan == Some(plan.id);
            let actions = if current {
                vec![PlanAction::Cancel]
            } else {
                vec![PlanAction::StartTrial, PlanAction::Subscribe]
            };
            PlanCard {
                id: plan.id,
                title: plan.title,
                monthly_price_cents: plan.monthly_price_cents,
                annual_price_cents: plan.annual_price_cents,
                audience: plan.audience,
                benefits: plan.benefits,
                current,
                actions,
            }
        })
        .collect();

    Ok(Json(CatalogResponse {
        billing_cycle,
        plans,
    }))
}

/// Billing-cycle preference body/response.
#[derive(Debug, Serialize, Deserialize)]
pub struct BillingCycleBody {
    /// The preference.
    pub billing_cycle: BillingCycle,
}

/// Get the caller's pricing-view preference.
pub async fn get_billing_cycle(
    State(state): State<Arc<AppState>>,
    account: CurrentAccount,
) -> Result<Json<BillingCycleBody>, ApiError> {
    let billing_cycle = state
        .store
        .get_billing_cycle(&account.email)?
        .unwrap_or_default();
    Ok(Json(BillingCycleBody { billing_cycle }))
}

/// Persist the caller's pricing-view preference.
pub async fn put_billing_cycle(
    State(state): State<Arc<AppState>>,
    account: CurrentAccount,
    Json(body): Json<BillingCycleBody>,
) -> Result<Json<BillingCycleBody>, ApiError> {
    state
        .store
        .put_billing_cycle(&account.email, body.billing_cycle)?;
    Ok(Json(body))
}

/// Trial activation response.
#[derive(Debug, Serialize)]
pub struct TrialStartedResponse {
    /// The plan the trial is for.
    pub plan: PlanId,
    /// Days granted.
    pub days: i64,
    /// When the trial ends.
    pub trial_end: Option<DateTime<Utc>>,
    /// User-facing message.
    pub message: String,
    /// Where to send the user next.
    pub redirect: String,
    /// Cosmetic delay before redirecting.
    pub redirect_after_ms: u64,
}

/// Start a free trial for a plan.
///
/// The trial-usage ledger permanently blocks a second trial for the same
/// `(account, plan)` pair; the ledger check and the entitlement replacement
/// are one atomic store operation.
pub async fn start_trial(
    State(state): State<Arc<AppState>>,
    account: CurrentAccount,
    Path(plan): Path<String>,
) -> Result<Json<TrialStartedResponse>, ApiError> {
    let plan: PlanId = plan
        .parse()
        .map_err(|_| ApiError::NotFound(format!("unknown plan: {plan}")))?;

    let now = Utc::now();
    let record = Entitlement::trial(account.email.clone(), plan, now);
    let ledger = TrialLedgerEntry::open(account.email.clone(), plan, now);

    state.store.start_trial(&record, &ledger)?;

    tracing::info!(account = %account.email, plan = %plan, "trial started");
    state
        .events
        .publish(EntitlementChanged::activated(account.email.clone(), plan));

    Ok(Json(TrialStartedResponse {
        plan,
        days: TRIAL_DAYS,
        trial_end: record.trial_end,
        message: format!(
            "Your {TRIAL_DAYS}-day free trial of {} has started",
            plan.plan().title
        ),
        redirect: state.config.dashboard_url(),
        redirect_after_ms: REDIRECT_AFTER_MS,
    }))
}
