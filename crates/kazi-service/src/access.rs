//! The access evaluator.
//!
//! Wires the pure classification from `kazi_core::access` to the store and
//! the event bus. This is where expiry-on-read happens: evaluating an
//! elapsed trial flips that one record inactive, stamps `expired_at`,
//! clears the premium projection, and publishes the change, then reports
//! the denial. Expiry is idempotent, so racing evaluations (two tabs, the
//! sweep) produce one set of side effects.
//!
//! Evaluation never errors toward the caller: a store failure or a corrupt
//! record degrades to `no_subscription` with a logged diagnostic, because
//! the safest reading of state we cannot trust is "no access".

use chrono::{DateTime, Utc};

use kazi_core::{
    classify, AccessDecision, AccountEmail, Classification, DenialReason, EntitlementChanged,
};
use kazi_store::Store;

use crate::events::EventBus;

/// Evaluate access for the (possibly absent) account, as of now.
pub fn evaluate(
    store: &dyn Store,
    events: &EventBus,
    account: Option<&AccountEmail>,
) -> AccessDecision {
    evaluate_at(store, events, account, Utc::now())
}

/// Evaluate access at an explicit instant.
pub fn evaluate_at(
    store: &dyn Store,
    events: &EventBus,
    account: Option<&AccountEmail>,
    now: DateTime<Utc>,
) -> AccessDecision {
    let Some(email) = account else {
        return AccessDecision::denied(DenialReason::NoAccount);
    };

    let record = match store.get_active_entitlement(email) {
        Ok(record) => record,
        Err(e) => {
            tracing::error!(account = %email, error = %e, "entitlement lookup failed; denying");
            return AccessDecision::denied(DenialReason::NoSubscription);
        }
    };

    let Some(record) = record else {
        return AccessDecision::denied(DenialReason::NoSubscription);
    };

    match classify(&record, now) {
        Classification::PaidActive => AccessDecision::Granted {
            subscription: record,
            trial: None,
        },
        Classification::TrialActive(status) => {
            tracing::debug!(
                account = %email,
                plan = %record.plan_id,
                days_left = status.days_left,
                "trial active"
            );
            AccessDecision::Granted {
                subscription: record,
                trial: Some(status),
            }
        }
        Classification::TrialElapsed => {
            expire_on_read(store, events, &record.id, email, record.plan_id, now);
            AccessDecision::denied(DenialReason::TrialExpired {
                expired_plan: record.plan_id,
            })
        }
    }
}

/// The expiry-on-read side effect.
///
/// Scoped to the single matching record. `Ok(None)` means another
/// evaluation got there first; nothing further to do or publish.
fn expire_on_read(
    store: &dyn Store,
    events: &EventBus,
    id: &kazi_core::EntitlementId,
    email: &AccountEmail,
    plan: kazi_core::PlanId,
    now: DateTime<Utc>,
) {
    match store.expire_entitlement(id, now) {
        Ok(Some(_)) => {
            tracing::info!(account = %email, plan = %plan, "trial expired on read");
            events.publish(EntitlementChanged::trial_expired(email.clone(), plan));
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(account = %email, error = %e, "failed to expire elapsed trial");
        }
    }
}
