//! `RocksDB` storage layer for kazi entitlements.
//!
//! This crate provides persistent storage for entitlement records, the
//! trial-usage ledger, the denormalized account projection, and the
//! billing-cycle preference, using `RocksDB` with column families.
//!
//! # Architecture
//!
//! - `entitlements`: full record history, keyed by ULID record id
//! - `entitlements_by_account`: per-account index, `email || 0x00 || id`
//! - `trial_ledger`: one entry per `(email, plan)`, written once
//! - `projections`: the premium display mirror, keyed by email
//! - `preferences`: the billing-cycle toggle, keyed by email
//!
//! The multi-record invariants (one active record per account, trial
//! once per plan) are enforced by the compound operations, each of which
//! commits a single `WriteBatch`.
//!
//! # Example
//!
//! ```no_run
//! use kazi_store::{RocksStore, Store};
//! use kazi_core::{AccountEmail, Entitlement, PlanId};
//! use chrono::Utc;
//!
//! let store = RocksStore::open("/tmp/kazi-entitlements-db").unwrap();
//!
//! let email: AccountEmail = "a@x.com".parse().unwrap();
//! let record = Entitlement::paid(
//!     email.clone(),
//!     PlanId::ClientPro,
//!     kazi_core::PaymentMethod::Mpesa,
//!     Utc::now(),
//! );
//! store.activate_entitlement(&record).unwrap();
//!
//! let active = store.get_active_entitlement(&email).unwrap();
//! assert!(active.is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};

use kazi_core::{
    AccountEmail, AccountProjection, BillingCycle, Entitlement, EntitlementId, PlanId,
    TrialLedgerEntry,
};

/// The storage trait defining all database operations.
///
/// This is the explicit repository interface injected into the access
/// evaluator and the two writer flows (trial activation, checkout
/// settlement), instead of any ambient shared state.
pub trait Store: Send + Sync {
    // =========================================================================
    // Entitlement Operations
    // =========================================================================

    /// Get the single active entitlement for an account, if any.
    ///
    /// Unparsable records are skipped with a logged warning; corruption
    /// degrades to "no record", never to an error for the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_active_entitlement(&self, email: &AccountEmail) -> Result<Option<Entitlement>>;

    /// List an account's full entitlement history, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_entitlements(&self, email: &AccountEmail) -> Result<Vec<Entitlement>>;

    /// Activate a record, replacing any prior active record for the same
    /// account, and refresh the projection. Single atomic write.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn activate_entitlement(&self, record: &Entitlement) -> Result<()>;

    /// Activate a trial record and write its ledger entry atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::TrialAlreadyUsed` if the ledger already holds an
    ///   entry for this `(email, plan)` pair.
    fn start_trial(&self, record: &Entitlement, ledger: &TrialLedgerEntry) -> Result<()>;

    /// Expire a trial record: flip `active` off, stamp `expired_at`, clear
    /// the premium projection. Idempotent: expiring an already-inactive
    /// record returns `Ok(None)` with no writes.
    ///
    /// Returns the updated record when this call performed the expiry.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no such record exists.
    fn expire_entitlement(
        &self,
        id: &EntitlementId,
        now: DateTime<Utc>,
    ) -> Result<Option<Entitlement>>;

    /// Cancel the account's active entitlement immediately: flip `active`
    /// off (no `expired_at` stamp, no grace) and clear the projection.
    ///
    /// Returns the cancelled record, or `None` when there was nothing
    /// active to cancel.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn cancel_entitlement(&self, email: &AccountEmail) -> Result<Option<Entitlement>>;

    /// List every active trial record across all accounts (the idle-expiry
    /// sweep input).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_active_trials(&self) -> Result<Vec<Entitlement>>;

    // =========================================================================
    // Trial Ledger Operations
    // =========================================================================

    /// Whether the account ever started a trial for this plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn has_used_trial(&self, email: &AccountEmail, plan: PlanId) -> Result<bool>;

    /// List the account's trial-ledger entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_trial_ledger(&self, email: &AccountEmail) -> Result<Vec<TrialLedgerEntry>>;

    // =========================================================================
    // Projection & Preference Operations
    // =========================================================================

    /// Get the denormalized premium projection for an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_projection(&self, email: &AccountEmail) -> Result<Option<AccountProjection>>;

    /// Get the billing-cycle display preference.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_billing_cycle(&self, email: &AccountEmail) -> Result<Option<BillingCycle>>;

    /// Persist the billing-cycle display preference.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_billing_cycle(&self, email: &AccountEmail, cycle: BillingCycle) -> Result<()>;
}
