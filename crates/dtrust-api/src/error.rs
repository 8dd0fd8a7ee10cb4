//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`OnboardingError`] kinds to HTTP status codes. Upstream and
//! internal details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dtrust_onboarding::{ErrorKind, OnboardingError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Error code and message.
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable code, e.g. `NOT_FOUND`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (422).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A time-boxed request arrived too late (410).
    #[error("expired: {0}")]
    Expired(String),

    /// A collaborator failed (502). `public` is what the client sees.
    #[error("upstream error: {detail}")]
    Upstream {
        /// Message returned to the client.
        public: String,
        /// Internal detail, logged but not exposed.
        detail: String,
    },

    /// Internal server error (500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Expired(_) => (StatusCode::GONE, "EXPIRED"),
            Self::Upstream { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        self.status_and_code().0
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::Upstream { public, .. } => public.clone(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Upstream { .. } => tracing::error!(error = %self, "upstream collaborator error"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<OnboardingError> for AppError {
    fn from(err: OnboardingError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Expired => Self::Expired(message),
            ErrorKind::Upstream => Self::Upstream {
                public: err.public_message(),
                detail: message,
            },
        }
    }
}

impl From<dtrust_core::ValidationError> for AppError {
    fn from(err: dtrust_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}
