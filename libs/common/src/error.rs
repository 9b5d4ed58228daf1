//! Custom error types for the common library
//!
//! This module defines the error raised by every record store operation,
//! whichever backend serves it.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for record store operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// A row came back in a shape the typed records cannot represent
    #[error("Database decode error: {0}")]
    Decode(String),

    /// The backend refused or could not serve the call
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        match err {
            SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) => {
                DatabaseError::Connection(err)
            }
            SqlxError::ColumnDecode { .. } | SqlxError::Decode(_) => {
                DatabaseError::Decode(err.to_string())
            }
            other => DatabaseError::Query(other),
        }
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
