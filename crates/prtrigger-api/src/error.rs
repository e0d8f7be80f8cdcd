//! API error handling.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<prtrigger_core::Error> for ApiError {
    fn from(err: prtrigger_core::Error) -> Self {
        match err {
            prtrigger_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            prtrigger_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            prtrigger_core::Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
