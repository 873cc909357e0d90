//! HTTP API service for kazi entitlements.
//!
//! Wires the core entitlement logic and the store into an Axum service:
//!
//! - **Access**: `/v1/access` and the feature guard, with expiry-on-read
//! - **Plans**: catalog, pricing-view preference, trial activation
//! - **Subscription**: immediate cancellation, audit history
//! - **Checkout**: the draft state machine over simulated settlement
//! - **Events**: the entitlement-changed broadcast bus and its SSE feed
//! - **Sweep**: the coarse background pass for trials that elapse while
//!   every view is idle

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod access;
pub mod auth;
pub mod config;
pub mod drafts;
pub mod error;
pub mod events;
pub mod gateway;
pub mod guard;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod sweep;

pub use config::ServiceConfig;
pub use routes::create_router;
pub use state::AppState;
