//! Entitlement records, the trial-usage ledger, and the account projection.
//!
//! The entitlement record is the source of truth for premium access. The
//! core invariant: for a given account email, at most one record is active
//! at any time; activating a new record replaces (deactivates) the prior
//! one. Records are never deleted; an inactive record keeps its `plan_id`
//! and `method` for audit but never grants access again.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::checkout::PaymentMethod;
use crate::ids::{AccountEmail, EntitlementId};
use crate::plan::PlanId;

/// Length of a free trial, in days.
pub const TRIAL_DAYS: i64 = 3;

/// The persisted record of who has access to what.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entitlement {
    /// Time-ordered record id.
    pub id: EntitlementId,

    /// The owning account.
    pub account_email: AccountEmail,

    /// The plan this record grants.
    pub plan_id: PlanId,

    /// When the record was activated.
    pub since: DateTime<Utc>,

    /// Whether this record currently grants access.
    pub active: bool,

    /// Whether this is a trial record.
    pub is_trial: bool,

    /// Trial cutoff; present iff `is_trial`, always `since + TRIAL_DAYS`.
    pub trial_end: Option<DateTime<Utc>>,

    /// How the subscription was paid for; absent for pure trials.
    pub method: Option<PaymentMethod>,

    /// Set only when a trial was lazily expired.
    pub expired_at: Option<DateTime<Utc>>,
}

impl Entitlement {
    /// Create an active trial record starting now.
    #[must_use]
    pub fn trial(account_email: AccountEmail, plan_id: PlanId, now: DateTime<Utc>) -> Self {
        Self {
            id: EntitlementId::generate(),
            account_email,
            plan_id,
            since: now,
            active: true,
            is_trial: true,
            trial_end: Some(now + Duration::days(TRIAL_DAYS)),
            method: None,
            expired_at: None,
        }
    }

    /// Create an active paid record starting now.
    #[must_use]
    pub fn paid(
        account_email: AccountEmail,
        plan_id: PlanId,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntitlementId::generate(),
            account_email,
            plan_id,
            since: now,
            active: true,
            is_trial: false,
            trial_end: None,
            method: Some(method),
            expired_at: None,
        }
    }

    /// Flip the record inactive because its trial elapsed.
    ///
    /// Idempotent: an already-inactive record is untouched, so a second
    /// expiry pass cannot move the `expired_at` stamp.
    pub fn expire(&mut self, now: DateTime<Utc>) {
        if !self.active {
            return;
        }
        self.active = false;
        self.expired_at = Some(now);
    }

    /// Flip the record inactive immediately (cancellation or replacement).
    ///
    /// No grace period and no `expired_at` stamp; that field marks trial
    /// expiry only.
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

/// A trial-usage ledger entry.
///
/// Written once when an account first starts a trial for a plan; its mere
/// presence permanently blocks a second trial for that `(email, plan)`
/// pair, whatever happened to the entitlement record since.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialLedgerEntry {
    /// The account that used the trial.
    pub email: AccountEmail,

    /// The plan the trial was for.
    pub plan_id: PlanId,

    /// When the trial started.
    pub start_date: DateTime<Utc>,

    /// When the trial was due to end.
    pub end_date: DateTime<Utc>,

    /// Whether the trial was still running when this entry was written.
    pub active: bool,
}

impl TrialLedgerEntry {
    /// Open a ledger entry for a trial starting now.
    #[must_use]
    pub fn open(email: AccountEmail, plan_id: PlanId, now: DateTime<Utc>) -> Self {
        Self {
            email,
            plan_id,
            start_date: now,
            end_date: now + Duration::days(TRIAL_DAYS),
            active: true,
        }
    }
}

/// Denormalized premium mirror kept for fast display.
///
/// Refreshed by every mutating operation; never the source of truth. A
/// stale projection is a display bug, not an access bug, since access
/// decisions always re-derive from the entitlement records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountProjection {
    /// The account.
    pub email: AccountEmail,

    /// Whether the account currently has premium access.
    pub premium: bool,

    /// The active plan, if any.
    pub premium_plan: Option<PlanId>,

    /// Whether the active record is a trial.
    pub is_trial: bool,

    /// The trial cutoff, if on trial.
    pub trial_end: Option<DateTime<Utc>>,
}

impl AccountProjection {
    /// Project from the current active record (or its absence).
    #[must_use]
    pub fn of(email: AccountEmail, active: Option<&Entitlement>) -> Self {
        match active {
            Some(record) => Self {
                email,
                premium: true,
                premium_plan: Some(record.plan_id),
                is_trial: record.is_trial,
                trial_end: record.trial_end,
            },
            None => Self::none(email),
        }
    }

    /// The no-access projection.
    #[must_use]
    pub fn none(email: AccountEmail) -> Self {
        Self {
            email,
            premium: false,
            premium_plan: None,
            is_trial: false,
            trial_end: None,
        }
    }
}
