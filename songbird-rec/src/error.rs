//! Error types for songbird-rec HTTP handlers

use crate::provider::ProviderError;
use crate::recommend::RecommendError;
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
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Nothing could be recommended (404)
    #[error("{0}")]
    NoRecommendations(String),

    /// Feature disabled by configuration (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Upstream provider failure surfaced directly (502)
    #[error("Upstream error: {0}")]
    Upstream(#[from] ProviderError),
}

impl From<RecommendError> for ApiError {
    fn from(err: RecommendError) -> Self {
        match err {
            RecommendError::Validation(msg) => ApiError::BadRequest(msg),
            err @ RecommendError::NoRecommendations => ApiError::NoRecommendations(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::NoRecommendations(msg) => {
                (StatusCode::NOT_FOUND, "NO_RECOMMENDATIONS", msg)
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg)
            }
            ApiError::Upstream(ProviderError::InvalidRequest(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Upstream(ref err) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", err.to_string()),
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
