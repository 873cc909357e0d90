//! Checkout flow handlers.
//!
//! The HTTP surface over the `CheckoutDraft` state machine. Drafts live in
//! the in-memory registry; the only persisted outcome is the entitlement
//! written when settlement succeeds. Locking discipline: every state
//! transition happens under the registry lock, so a second confirmation
//! racing a settlement sees `Settling` and is rejected.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use kazi_core::{
    qr, BillingDetails, CardDetails, CheckoutDraft, CheckoutState, Entitlement,
    EntitlementChanged, FieldError, PaymentDetails, PaymentMethod, PlanId,
};

use crate::auth::CurrentAccount;
use crate::error::ApiError;
use crate::state::AppState;

/// What the UI sees of a draft. Raw payment fields stay in the registry.
#[derive(Debug, Serialize)]
pub struct DraftView {
    /// Draft id.
    pub id: String,
    /// The plan being bought.
    pub plan: PlanId,
    /// Machine state.
    pub state: CheckoutState,
    /// Selected method tag, once selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<PaymentMethod>,
    /// Whether validated details are on the draft.
    pub details_complete: bool,
    /// Field errors from the last rejected submission.
    pub errors: Vec<FieldError>,
    /// Top-level error from the last failed settlement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl From<&CheckoutDraft> for DraftView {
    fn from(draft: &CheckoutDraft) -> Self {
        Self {
            id: draft.id.to_string(),
            plan: draft.plan_id,
            state: draft.state,
            method: draft.method,
            details_complete: draft.details.is_some(),
            errors: draft.errors.clone(),
            last_error: draft.last_error.clone(),
        }
    }
}

/// Open-checkout request.
#[derive(Debug, Deserialize)]
pub struct OpenRequest {
    /// The plan to buy.
    pub plan: String,
}

/// Open a draft for a plan, in `SelectingMethod`.
pub async fn open(
    State(state): State<Arc<AppState>>,
    account: CurrentAccount,
    Json(body): Json<OpenRequest>,
) -> Result<Json<DraftView>, ApiError> {
    let plan: PlanId = body
        .plan
        .parse()
        .map_err(|_| ApiError::NotFound(format!("unknown plan: {}", body.plan)))?;

    let draft = CheckoutDraft::new(account.email, plan, Utc::now());
    let view = DraftView::from(&draft);
    tracing::info!(draft = %draft.id, plan = %plan, "checkout opened");
    state.drafts.insert(draft);

    Ok(Json(view))
}

/// Fetch the caller's draft.
pub async fn get(
    State(state): State<Arc<AppState>>,
    account: CurrentAccount,
    Path(id): Path<String>,
) -> Result<Json<DraftView>, ApiError> {
    let id = parse_draft_id(&id)?;
    state
        .drafts
        .with_draft(&id, &account.email, |draft| DraftView::from(&*draft))
        .map(Json)
        .ok_or_else(draft_not_found)
}

/// Destroy the caller's draft (cancel or navigation away).
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    account: CurrentAccount,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_draft_id(&id)?;
    state
        .drafts
        .remove(&id, &account.email)
        .ok_or_else(draft_not_found)?;
    tracing::info!(draft = %id, "checkout cancelled");
    Ok(Json(serde_json::json!({ "cancelled": true })))
}

/// Method selection request.
#[derive(Debug, Deserialize)]
pub struct MethodRequest {
    /// The method tag (`mpesa`, `card`, `paypal`, `crypto-<currency>`).
    pub method: String,
}

/// Select (or change) the payment method.
pub async fn select_method(
    State(state): State<Arc<AppState>>,
    account: CurrentAccount,
    Path(id): Path<String>,
    Json(body): Json<MethodRequest>,
) -> Result<Json<DraftView>, ApiError> {
    let id = parse_draft_id(&id)?;
    let method: PaymentMethod = body
        .method
        .parse()
        .map_err(|e: kazi_core::UnknownMethod| ApiError::BadRequest(e.to_string()))?;

    state
        .drafts
        .with_draft(&id, &account.email, |draft| {
            draft.select_method(method)?;
            Ok::<_, ApiError>(DraftView::from(&*draft))
        })
        .ok_or_else(draft_not_found)?
        .map(Json)
}

/// The loose details form.
///
/// Which fields matter depends on the selected method; absent required
/// fields surface as field errors rather than deserialization failures,
/// exactly like an empty form input.
#[derive(Debug, Default, Deserialize)]
pub struct DetailsRequest {
    /// Mobile-money phone number.
    pub phone: Option<String>,
    /// Card fields.
    pub card: Option<CardDetails>,
    /// Generic billing block (card and wallet methods).
    pub billing: Option<BillingDetails>,
    /// Wallet account email.
    pub email: Option<String>,
    /// Crypto destination address.
    pub address: Option<String>,
}

fn assemble_details(method: PaymentMethod, body: DetailsRequest) -> PaymentDetails {
    match method {
        PaymentMethod::Mpesa => PaymentDetails::MobileMoney {
            phone: body.phone.unwrap_or_default(),
        },
        PaymentMethod::Card => PaymentDetails::Card {
            card: body.card.unwrap_or_default(),
            billing: body.billing.unwrap_or_default(),
        },
        PaymentMethod::Paypal => PaymentDetails::Wallet {
            email: body.email.unwrap_or_default(),
            billing: body.billing.unwrap_or_default(),
        },
        PaymentMethod::Crypto(currency) => PaymentDetails::Crypto {
            currency,
            address: body.address.unwrap_or_default(),
        },
    }
}

/// Submit method-specific details; on success the draft reaches
/// `Reviewing`, on validation failure a 422 with field-scoped errors and no
/// state change.
pub async fn submit_details(
    State(state): State<Arc<AppState>>,
    account: CurrentAccount,
    Path(id): Path<String>,
    Json(body): Json<DetailsRequest>,
) -> Result<Json<DraftView>, ApiError> {
    let id = parse_draft_id(&id)?;

    state
        .drafts
        .with_draft(&id, &account.email, |draft| {
            let method = draft.method.ok_or(kazi_core::CheckoutError::MethodNotSelected)?;
            draft.submit_details(assemble_details(method, body))?;
            Ok::<_, ApiError>(DraftView::from(&*draft))
        })
        .ok_or_else(draft_not_found)?
        .map(Json)
}

/// Scan/paste intake request for the crypto method.
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// The scanned or pasted payload.
    pub payload: String,
}

/// Scan response.
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    /// The accepted address.
    pub address: String,
    /// The draft after intake.
    pub draft: DraftView,
}

/// Accept a scanned or pasted payload into a crypto draft.
///
/// Extracts an address candidate, runs it through the currency shape
/// check, and only then accepts it. A failed check is a field error with
/// no state transition.
pub async fn scan(
    State(state): State<Arc<AppState>>,
    account: CurrentAccount,
    Path(id): Path<String>,
    Json(body): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let id = parse_draft_id(&id)?;

    state
        .drafts
        .with_draft(&id, &account.email, |draft| {
            let Some(PaymentMethod::Crypto(currency)) = draft.method else {
                return Err(ApiError::Conflict(
                    "scanning applies to crypto checkout only".into(),
                ));
            };

            let address = qr::extract_address(&body.payload).ok_or_else(|| {
                ApiError::Validation(vec![FieldError::new(
                    "address",
                    "could not read an address from the scanned code",
                )])
            })?;

            draft.submit_details(PaymentDetails::Crypto { currency, address: address.clone() })?;
            Ok(ScanResponse {
                address,
                draft: DraftView::from(&*draft),
            })
        })
        .ok_or_else(draft_not_found)?
        .map(Json)
}

/// Confirmation response.
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    /// Always `succeeded` (failures are errors).
    pub status: &'static str,
    /// The plan now active.
    pub plan: PlanId,
    /// Gateway reference for the simulated transaction.
    pub reference: String,
    /// Where to send the user next.
    pub redirect: String,
}

/// Confirm the reviewed draft and settle.
///
/// The only trigger for `Reviewing -> Settling` is this explicit request.
/// While the gateway call is in flight the draft stays in `Settling` and
/// rejects every other operation, so a double-submit from a second tab
/// gets a 409 instead of a second charge.
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    account: CurrentAccount,
    Path(id): Path<String>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let id = parse_draft_id(&id)?;

    // Transition to Settling under the lock and take a copy of the details.
    let (details, plan) = state
        .drafts
        .with_draft(&id, &account.email, |draft| {
            let details = draft.begin_settlement()?;
            Ok::<_, ApiError>((details, draft.plan_id))
        })
        .ok_or_else(draft_not_found)??;

    // Gateway call happens outside the lock; the Settling state is the
    // double-submit guard.
    let settled = state.gateway.settle(&details).await;

    match settled {
        Ok(receipt) => {
            // Persist first, then publish, then destroy the draft. The
            // entitlement write is the step that must not be lost.
            let record =
                Entitlement::paid(account.email.clone(), plan, details.method(), Utc::now());
            if let Err(e) = state.store.activate_entitlement(&record) {
                tracing::error!(draft = %id, error = %e, "settled but failed to persist entitlement");
                let _ = state.drafts.with_draft(&id, &account.email, |draft| {
                    let _ = draft.fail("could not record the subscription; please retry");
                });
                return Err(ApiError::SettlementFailed(
                    "could not record the subscription; please retry".into(),
                ));
            }

            tracing::info!(
                account = %account.email,
                plan = %plan,
                method = %details.method(),
                reference = %receipt.reference,
                "subscription activated"
            );
            state
                .events
                .publish(EntitlementChanged::activated(account.email.clone(), plan));

            let _ = state.drafts.with_draft(&id, &account.email, |draft| {
                let _ = draft.complete();
            });
            let _ = state.drafts.remove(&id, &account.email);

            Ok(Json(ConfirmResponse {
                status: "succeeded",
                plan,
                reference: receipt.reference,
                redirect: state.config.dashboard_url(),
            }))
        }
        Err(e) => {
            // Draft preserved with its details so the user can retry
            // without re-entering anything.
            tracing::warn!(draft = %id, error = %e, "settlement failed");
            let _ = state.drafts.with_draft(&id, &account.email, |draft| {
                let _ = draft.fail(e.to_string());
            });
            Err(ApiError::SettlementFailed(e.to_string()))
        }
    }
}

fn parse_draft_id(raw: &str) -> Result<kazi_core::DraftId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound("checkout draft not found".into()))
}

fn draft_not_found() -> ApiError {
    ApiError::NotFound("checkout draft not found".into())
}
