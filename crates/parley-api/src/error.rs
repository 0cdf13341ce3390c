//! API error types and JSON error response formatting.
//!
//! ApiError provides a consistent JSON error body across all endpoints and
//! centralizes the mapping from [`ParleyError`] to HTTP status codes: bad
//! caller input maps to 4xx, upstream service failures to 502, and storage
//! or internal faults to a sanitized 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use parley_core::ParleyError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid request data.
    BadRequest(String),
    /// 404 Not Found - resource does not exist.
    NotFound(String),
    /// 502 Bad Gateway - a remote service (completion, speech) failed.
    BadGateway(String),
    /// 500 Internal Server Error - storage or unexpected server fault.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ParleyError> for ApiError {
    fn from(err: ParleyError) -> Self {
        match err {
            ParleyError::EmptyTranscript => {
                ApiError::BadRequest("Could not understand the audio".to_string())
            }
            ParleyError::InvalidInput(msg) => ApiError::BadRequest(msg),
            ParleyError::NotFound(msg) => ApiError::NotFound(msg),
            ParleyError::Transcription(msg)
            | ParleyError::Completion(msg)
            | ParleyError::Synthesis(msg) => ApiError::BadGateway(msg),
            // Storage details can carry paths and SQL; never echo them.
            ParleyError::Storage(_) => ApiError::Internal("Internal storage error".to_string()),
            _ => ApiError::Internal("Internal server error".to_string()),
        }
    }
}
