//! Error Types

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Durable store unreachable or rejected an operation
    #[error("Store error: {0}")]
    Store(String),

    /// Identity provider unreachable or returned an unexpected response
    #[error("Identity provider error: {0}")]
    Identity(String),
}
