//! Core types and logic for the kazi entitlement subsystem.
//!
//! This crate holds everything that can be expressed without I/O:
//!
//! - **Identifiers**: `AccountEmail`, `EntitlementId`, `DraftId`
//! - **Plans**: the static `CATALOG`, `PlanId`, `BillingCycle`
//! - **Entitlements**: `Entitlement`, `TrialLedgerEntry`, `AccountProjection`
//! - **Access**: `AccessDecision`, `classify`, the `days_left` countdown
//! - **Checkout**: `CheckoutDraft` and its state machine, `PaymentMethod`,
//!   per-method validation, QR/address intake
//! - **Events**: the `EntitlementChanged` signal payload
//!
//! Persistence lives in `kazi-store`; the HTTP surface, the simulated
//! settlement gateway, and the event bus live in `kazi-service`.
//!
//! # Time
//!
//! Every time-dependent function takes `now` as a parameter. The trial
//! window is fixed at [`TRIAL_DAYS`] days and the countdown rounds up, so a
//! trial with one second left still reports its final day.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod access;
pub mod checkout;
pub mod entitlement;
pub mod event;
pub mod ids;
pub mod plan;
pub mod qr;
pub mod validate;

pub use access::{classify, days_left, AccessDecision, Classification, DenialReason, TrialStatus};
pub use checkout::{
    BillingDetails, CardDetails, CheckoutDraft, CheckoutError, CheckoutState, CryptoCurrency,
    PaymentDetails, PaymentMethod, UnknownMethod,
};
pub use entitlement::{AccountProjection, Entitlement, TrialLedgerEntry, TRIAL_DAYS};
pub use event::EntitlementChanged;
pub use ids::{AccountEmail, DraftId, EntitlementId, IdError};
pub use plan::{catalog, Audience, BillingCycle, Plan, PlanId, UnknownPlan, CATALOG};
pub use validate::FieldError;
