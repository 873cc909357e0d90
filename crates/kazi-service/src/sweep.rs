//! The idle trial-expiry sweep.
//!
//! Expiry normally happens on read, but a trial can elapse while no view
//! is asking. This coarse background tick walks the active trials and
//! expires the elapsed ones with exactly the same (idempotent) side
//! effects, so a guard that wakes up later only ever re-reads a settled
//! state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;

use kazi_core::{classify, Classification, EntitlementChanged};
use kazi_store::Store;

use crate::events::EventBus;
use crate::state::AppState;

/// Spawn the sweep loop.
pub fn spawn(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let interval = state.config.sweep_interval_seconds.max(1);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_once(state.store.as_ref(), &state.events, Utc::now());
        }
    })
}

/// Run one sweep pass; returns how many trials were expired.
pub fn run_once(store: &dyn Store, events: &EventBus, now: DateTime<Utc>) -> usize {
    let trials = match store.list_active_trials() {
        Ok(trials) => trials,
        Err(e) => {
            tracing::error!(error = %e, "trial sweep could not list active trials");
            return 0;
        }
    };

    let mut expired = 0;
    for record in trials {
        if classify(&record, now) != Classification::TrialElapsed {
            continue;
        }
        match store.expire_entitlement(&record.id, now) {
            Ok(Some(_)) => {
                tracing::info!(
                    account = %record.account_email,
                    plan = %record.plan_id,
                    "trial expired by sweep"
                );
                events.publish(EntitlementChanged::trial_expired(
                    record.account_email.clone(),
                    record.plan_id,
                ));
                expired += 1;
            }
            // A read beat the sweep to it; nothing left to do.
            Ok(None) => {}
            Err(e) => {
                tracing::error!(
                    account = %record.account_email,
                    error = %e,
                    "sweep failed to expire trial"
                );
            }
        }
    }

    expired
}
