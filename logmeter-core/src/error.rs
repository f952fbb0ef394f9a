//! Error types for metric store operations

use thiserror::Error;

/// Metric store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Metric store lock poisoned")]
    LockPoisoned,

    #[error("Metric not found: {name}")]
    NotFound { name: String },
}

/// Result type alias for metric store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// TESTS
// =============================================================================
