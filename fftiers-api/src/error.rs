//! Error types for fftiers-api

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fftiers_engine::TierError;
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Tier engine error
    #[error("Tier error: {0}")]
    Tier(#[from] TierError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Tier(ref err) => match err {
                TierError::UnknownFormat(_)
                | TierError::InvalidTierCount(_)
                | TierError::NonFiniteValue(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_TIER_INPUT", err.to_string())
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "TIER_ERROR", err.to_string()),
            },
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
