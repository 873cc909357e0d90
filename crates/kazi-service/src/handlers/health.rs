//! Health check handler.

use axum::Json;
use serde::Serialize;

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" when the service is up.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
}

/// Health check.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "kazi-entitlements",
    })
}
