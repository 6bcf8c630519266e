// src/errors.rs
// Error taxonomy for the EscalateAI backend
//
// Three classes cross the handler boundary:
// - ClientValidation  -> 422, the offending constraint in the message
// - NotConfigured     -> 503, provider credential missing
// - Upstream          -> 502, every candidate model exhausted
// Transient provider errors never reach here; they are retried inside the
// model gateway and only the aggregated failure surfaces.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Result type for request validation
pub type ValidationResult = Result<(), ValidationError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    ClientValidation(#[from] ValidationError),

    /// Credential missing; reported before any outbound call is made.
    #[error("AI models are not available. Please check API configuration.")]
    NotConfigured,

    /// All candidate models failed. The underlying cause is logged
    /// server-side only; callers get this generic message.
    #[error("Failed to generate complaint (all models failed). Please try again later.")]
    Upstream,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ClientValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream => StatusCode::BAD_GATEWAY,
        }
    }
}

/// JSON error body returned to clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
