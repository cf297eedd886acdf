use thiserror::Error;

use crate::domain::DomainError;

/// Which half of a credential check failed.
///
/// Only ever logged; clients see a single "invalid credentials" error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFailure {
    UnknownUser,
    WrongPassword,
}

impl CredentialFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownUser => "unknown_user",
            Self::WrongPassword => "wrong_password",
        }
    }
}

/// Authentication failures. The variants keep the diagnostic detail; the
/// HTTP boundary folds them into a few generic messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingToken,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Token signature does not match")]
    InvalidSignature,

    #[error("Token rejected: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid credentials ({})", .0.as_str())]
    InvalidCredentials(CredentialFailure),
}

impl AuthError {
    /// Short label for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::MalformedToken(_) => "malformed",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidToken(_) => "invalid_claims",
            Self::Expired => "expired",
            Self::InvalidCredentials(failure) => failure.as_str(),
        }
    }

    /// The message a client is allowed to see.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing token",
            Self::InvalidCredentials(_) => "invalid credentials",
            Self::MalformedToken(_)
            | Self::InvalidSignature
            | Self::InvalidToken(_)
            | Self::Expired => "invalid token",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed request fields
    #[error("Validation: {0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Hashing/signing primitive or backend failure
    #[error("Internal: {0}")]
    Internal(String),
}

impl AppError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        Self::Internal(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
