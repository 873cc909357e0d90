//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{access, checkout, events, health, plans, subscription};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Access (account optional; absence is a decision, not an error)
/// - `GET /v1/access` - Raw access decision
/// - `GET /v1/guard/{feature}` - Feature-guard render decision
/// - `GET /v1/entitlements/events` - Entitlement-changed SSE feed
///
/// ## Gated example
/// - `GET /v1/features/{feature}` - A view behind `RequireEntitlement`
///
/// ## Plans (authenticated)
/// - `GET /v1/plans` - Catalog with per-plan actions
/// - `GET/PUT /v1/plans/billing-cycle` - Pricing-view preference
/// - `POST /v1/plans/{plan}/trial` - Start a free trial
///
/// ## Subscription (authenticated)
/// - `POST /v1/subscription/cancel` - Immediate cancellation
/// - `GET /v1/subscription/history` - Entitlement audit history
///
/// ## Checkout (authenticated)
/// - `POST /v1/checkout` - Open a draft
/// - `GET/DELETE /v1/checkout/{id}` - Inspect / destroy a draft
/// - `POST /v1/checkout/{id}/method` - Select payment method
/// - `PUT /v1/checkout/{id}/details` - Submit and validate details
/// - `POST /v1/checkout/{id}/scan` - Crypto QR/paste intake
/// - `POST /v1/checkout/{id}/confirm` - Confirm and settle
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Access & guard
        .route("/v1/access", get(access::get_access))
        .route("/v1/guard/:feature", get(access::guard_feature))
        .route("/v1/features/:feature", get(access::premium_feature))
        .route("/v1/entitlements/events", get(events::stream))
        // Plans
        .route("/v1/plans", get(plans::list_plans))
        .route(
            "/v1/plans/billing-cycle",
            get(plans::get_billing_cycle).put(plans::put_billing_cycle),
        )
        .route("/v1/plans/:plan/trial", post(plans::start_trial))
        // Subscription
        .route("/v1/subscription/cancel", post(subscription::cancel))
        .route("/v1/subscription/history", get(subscription::history))
        // Checkout
        .route("/v1/checkout", post(checkout::open))
        .route(
            "/v1/checkout/:id",
            get(checkout::get).delete(checkout::cancel),
        )
        .route("/v1/checkout/:id/method", post(checkout::select_method))
        .route("/v1/checkout/:id/details", put(checkout::submit_details))
        .route("/v1/checkout/:id/scan", post(checkout::scan))
        .route("/v1/checkout/:id/confirm", post(checkout::confirm))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
