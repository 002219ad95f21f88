//! API error type and HTTP status mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request payload or missing required field (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or malformed identity headers (401)
    #[error("Authentication required: {0}")]
    Unauthorized(String),

    /// Role not allowed to perform this mutation (403)
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Operation invalid for the inspection's current status (400)
    #[error("Invalid state: {0}")]
    State(String),

    /// Evidence gateway failure (502)
    #[error("Upstream dependency error: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<vistoria_common::Error> for ApiError {
    fn from(err: vistoria_common::Error) -> Self {
        use vistoria_common::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Validation(msg) => ApiError::Validation(msg),
            Error::Permission(msg) => ApiError::Permission(msg),
            Error::State(msg) => ApiError::State(msg),
            Error::Upstream(msg) => ApiError::Upstream(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(format!("Database error: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "AUTH_REQUIRED", msg),
            ApiError::Permission(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::State(msg) => (StatusCode::BAD_REQUEST, "INVALID_STATE", msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

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
