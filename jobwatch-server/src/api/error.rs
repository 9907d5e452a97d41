//! API Error Handling
//!
//! Maps service errors to HTTP status codes and the JSON error body the
//! front-end expects.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jobwatch_core::dto::session::ErrorResponse;

use crate::error::WatchError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    BadGateway(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = ErrorResponse {
            status: status.as_u16(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<WatchError> for ApiError {
    fn from(err: WatchError) -> Self {
        match err {
            WatchError::Validation(e) => ApiError::BadRequest(e.to_string()),
            WatchError::NotFound(id) => {
                tracing::debug!("Rejected unknown or expired session {}", id);
                ApiError::Unauthorized("Invalid or expired session".to_string())
            }
            WatchError::Connectivity(msg) => {
                tracing::warn!("Connectivity probe failed: {}", msg);
                ApiError::BadGateway("Unable to connect to database".to_string())
            }
            WatchError::Connection(msg) => {
                tracing::warn!("Database connection error: {}", msg);
                ApiError::BadGateway("Failed to connect to database".to_string())
            }
            WatchError::Query(msg) => {
                tracing::warn!("Error fetching jobs: {}", msg);
                ApiError::BadGateway("Failed to fetch jobs".to_string())
            }
            WatchError::Serialization(err) => {
                tracing::error!("Session data error: {}", err);
                ApiError::InternalError("Failed to process session data".to_string())
            }
            WatchError::Store(err) => {
                tracing::error!("Session store error: {}", err);
                ApiError::InternalError("Session store unavailable".to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        ApiError::BadRequest("Invalid JSON input".to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
