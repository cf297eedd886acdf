//! Domain errors

use thiserror::Error;

/// Domain-level error types
#[derive(Debug, Error)]
pub enum DomainError {
    /// The credential backend could not be read
    #[error("Credential store error: {0}")]
    Store(String),

    /// A seed record is unusable (duplicate username, bad hash, ...)
    #[error("Invalid user record: {0}")]
    InvalidRecord(String),
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
