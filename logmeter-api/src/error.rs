//! Error Types for the logmeter server
//!
//! `ApiError` is both the HTTP error body returned by the export handlers
//! and the error type of the binary's startup path.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use logmeter_core::StoreError;
use logmeter_runtime::LoadError;
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Category of an [`ApiError`], mapped to an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Configuration or request input was rejected
    InvalidInput,
    /// The metric store cannot be read
    StoreUnavailable,
    /// Anything else
    InternalError,
}

impl ErrorCode {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// API ERROR
// ============================================================================

/// Error returned to HTTP clients as `{"code": ..., "message": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreUnavailable, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Metric store error");
        match err {
            StoreError::LockPoisoned => ApiError::store_unavailable("Metric store is unavailable"),
            StoreError::NotFound { .. } => ApiError::internal_error(err.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::invalid_input(err.to_string())
    }
}

impl From<LoadError> for ApiError {
    fn from(err: LoadError) -> Self {
        ApiError::internal_error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::invalid_input("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(StoreError::LockPoisoned).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::internal_error("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_response_carries_status() {
        let response = ApiError::store_unavailable("down").into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_display_is_message() {
        let err = ApiError::from(ConfigError::ZeroPollInterval);
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(err.to_string(), ConfigError::ZeroPollInterval.to_string());
    }
}
