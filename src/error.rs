//! Error types for the image service.

use thiserror::Error;

/// Common error type for the image service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Rejected input: disallowed media type, missing field, oversized body.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failure that is neither the caller's fault nor plain I/O.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_panic() {
            ServiceError::Internal("blocking task panicked".to_string())
        } else {
            ServiceError::Internal(format!("blocking task failed: {e}"))
        }
    }
}

/// Result type alias for image service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
