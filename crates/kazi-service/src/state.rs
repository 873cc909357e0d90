//! Application state.

use std::sync::Arc;
use std::time::Duration;

use kazi_store::Store;

use crate::config::ServiceConfig;
use crate::drafts::DraftRegistry;
use crate::events::EventBus;
use crate::gateway::{PaymentGateway, SimulatedGateway};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The entitlement repository.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// The entitlement-changed broadcast bus.
    pub events: EventBus,

    /// The settlement gateway (simulated by default).
    pub gateway: Arc<dyn PaymentGateway>,

    /// Open checkout drafts.
    pub drafts: DraftRegistry,
}

impl AppState {
    /// Create application state with the simulated gateway.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let gateway = Arc::new(SimulatedGateway::new(Duration::from_millis(
            config.settle_delay_ms,
        )));
        Self::with_gateway(store, config, gateway)
    }

    /// Create application state with a specific gateway implementation.
    #[must_use]
    pub fn with_gateway(
        store: Arc<dyn Store>,
        config: ServiceConfig,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            store,
            config,
            events: EventBus::new(),
            gateway,
            drafts: DraftRegistry::new(),
        }
    }
}
