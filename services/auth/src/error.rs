//! Outcomes of authentication and employee management

use common::error::DatabaseError;
use thiserror::Error;

/// Every failure the auth crate reports to its callers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Sign-in matched no active employee. Deliberately says nothing about which field was wrong.
    #[error("Invalid name or password")]
    InvalidCredentials,

    /// The stored session no longer resolves to an active employee
    #[error("Session is no longer valid")]
    SessionInvalid,

    /// A record store call failed
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Missing or malformed input, caught before any backend call
    #[error("{0}")]
    Validation(String),

    /// The identity may not perform this operation
    #[error("Not allowed to perform this operation")]
    Forbidden,

    #[error("Employee not found")]
    NotFound,

    /// Sign-in throttled for this handle
    #[error("Too many sign-in attempts, try again later")]
    TooManyAttempts,
}

impl From<DatabaseError> for AuthError {
    fn from(err: DatabaseError) -> Self {
        AuthError::BackendUnavailable(err.to_string())
    }
}

/// Type alias for Result with AuthError
pub type AuthResult<T> = Result<T, AuthError>;
