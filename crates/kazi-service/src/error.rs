//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use kazi_core::{CheckoutError, DenialReason, FieldError};

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No authenticated account on a request that needs one.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Access to a gated feature was denied.
    #[error("access denied: {}", .reason.code())]
    AccessDenied {
        /// The denial reason from the evaluator.
        reason: DenialReason,
        /// User-facing message.
        message: String,
    },

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The account already used its trial for this plan.
    #[error("trial already used for plan {plan}")]
    TrialAlreadyUsed {
        /// The plan whose trial was consumed.
        plan: String,
    },

    /// One or more checkout fields failed validation.
    #[error("{} field(s) failed validation", .0.len())]
    Validation(Vec<FieldError>),

    /// The simulated gateway declined or errored.
    #[error("settlement failed: {0}")]
    SettlementFailed(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                "not_authenticated",
                "Sign in to continue".to_string(),
                None,
            ),
            Self::AccessDenied { reason, message } => (
                StatusCode::FORBIDDEN,
                reason.code(),
                message.clone(),
                Some(serde_json::json!({ "reason": reason })),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::TrialAlreadyUsed { plan } => (
                StatusCode::CONFLICT,
                "trial_already_used",
                format!("You have already used your free trial for {plan}"),
                None,
            ),
            Self::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_failed",
                "Some fields need attention".to_string(),
                Some(serde_json::json!({ "fields": errors })),
            ),
            Self::SettlementFailed(msg) => (
                StatusCode::BAD_GATEWAY,
                "settlement_failed",
                msg.clone(),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<kazi_store::StoreError> for ApiError {
    fn from(err: kazi_store::StoreError) -> Self {
        match err {
            kazi_store::StoreError::NotFound => Self::NotFound("record not found".into()),
            kazi_store::StoreError::TrialAlreadyUsed { plan, .. } => {
                Self::TrialAlreadyUsed { plan }
            }
            kazi_store::StoreError::Database(msg)
            | kazi_store::StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Validation(errors) => Self::Validation(errors),
            CheckoutError::SettlementInFlight => {
                Self::Conflict("a settlement is already in progress".into())
            }
            CheckoutError::InvalidTransition { .. }
            | CheckoutError::MethodNotSelected
            | CheckoutError::MethodMismatch { .. } => Self::Conflict(err.to_string()),
        }
    }
}
