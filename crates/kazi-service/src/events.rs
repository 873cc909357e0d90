//! The entitlement-changed broadcast bus.
//!
//! Every mutating operation publishes here after persisting; feature
//! guards, header badges, and the SSE feed subscribe instead of polling.

use tokio::sync::broadcast;

use kazi_core::EntitlementChanged;

/// Capacity of the broadcast channel. Slow SSE consumers that fall this far
/// behind see a lag error and simply miss events; they re-read the access
/// decision on the next one.
const CHANNEL_CAPACITY: usize = 64;

/// Process-wide publish point for entitlement changes.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EntitlementChanged>,
}

impl EventBus {
    /// Create a new bus.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish an entitlement change to all current subscribers.
    ///
    /// Publishing with no subscribers is normal (no open views) and is not
    /// an error.
    pub fn publish(&self, event: EntitlementChanged) {
        let receivers = self.tx.receiver_count();
        tracing::debug!(
            account = %event.account_email,
            active = event.active,
            receivers,
            "publishing entitlement change"
        );
        // send() only errors when there are no receivers.
        let _ = self.tx.send(event);
    }

    /// Subscribe to entitlement changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EntitlementChanged> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
