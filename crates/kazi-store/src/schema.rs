//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Entitlement records, keyed by `entitlement_id` (ULID). Full audit
    /// history: records are deactivated, never deleted.
    pub const ENTITLEMENTS: &str = "entitlements";

    /// Index: entitlements by account, keyed by
    /// `email || 0x00 || entitlement_id`. Value is empty (index only).
    pub const ENTITLEMENTS_BY_ACCOUNT: &str = "entitlements_by_account";

    /// Trial-usage ledger, keyed by `email || 0x00 || plan_id`. One entry
    /// per pair, written once, never mutated.
    pub const TRIAL_LEDGER: &str = "trial_ledger";

    /// Denormalized premium projections, keyed by email.
    pub const PROJECTIONS: &str = "projections";

    /// Billing-cycle display preferences, keyed by email.
    pub const PREFERENCES: &str = "preferences";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ENTITLEMENTS,
        cf::ENTITLEMENTS_BY_ACCOUNT,
        cf::TRIAL_LEDGER,
        cf::PROJECTIONS,
        cf::PREFERENCES,
    ]
}
