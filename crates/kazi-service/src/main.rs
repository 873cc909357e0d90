//! Kazi Entitlements Service - HTTP API for premium access and checkout
//!
//! This is the main entry point for the kazi-entitlements service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kazi_service::{create_router, sweep, AppState, ServiceConfig};
use kazi_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kazi=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Kazi Entitlements Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        settle_delay_ms = config.settle_delay_ms,
        sweep_interval_seconds = config.sweep_interval_seconds,
        "Service configuration loaded"
    );

    // Initialize RocksDB store
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    // Build app state
    let state = Arc::new(AppState::new(store, config.clone()));

    // Start the idle trial-expiry sweep
    let _sweep = sweep::spawn(Arc::clone(&state));

    // Create the router
    let app = create_router(state.as_ref().clone());
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
