//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use verikit_engine::EngineError;
use verikit_lib::VerikitError;

/// Wire shape for every error response.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

/// Error type returned by all handlers.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl From<VerikitError> for ApiError {
    fn from(e: VerikitError) -> Self {
        Self(EngineError::Lib(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            EngineError::ChallengeNotFound(_) => (StatusCode::NOT_FOUND, "CHALLENGE_NOT_FOUND"),
            EngineError::ChallengeExpired(_) => (StatusCode::GONE, "CHALLENGE_EXPIRED"),
            EngineError::TokenInUse(_) => (StatusCode::CONFLICT, "TOKEN_IN_USE"),
            EngineError::Lib(VerikitError::InvalidData { .. }) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST")
            }
            e if e.is_retryable() => (StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_UNAVAILABLE"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }

        let body = ErrorBody {
            error: code,
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
