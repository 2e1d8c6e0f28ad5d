//! # Store Error Types
//!
//! Errors surfaced by synced-store operations.
//!
//! Every mutating operation returns one of these - the store never logs and
//! swallows a failure. Callers decide whether to retry (see
//! [`StoreError::is_transient`]) or alert the user.

use thiserror::Error;

use caja_core::{CoreError, ValidationError};
use caja_db::DbError;

/// Errors from synced-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Input rejected before any remote effect (fail fast, no partial state).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Business rule violation (insufficient stock, bad transition, ...).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The document store rejected or could not complete an operation.
    #[error("Remote operation failed: {0}")]
    Remote(#[from] DbError),

    /// A remote operation did not resolve within the configured timeout.
    #[error("Operation '{op}' timed out")]
    Timeout { op: &'static str },

    /// Session persistence failed (the login itself still succeeded).
    #[error("Session persistence failed: {0}")]
    Session(String),

    /// Password hashing failed (argon2 parameter or salt error).
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl StoreError {
    /// Whether a bounded retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Timeout { .. } => true,
            StoreError::Remote(db) => db.is_transient(),
            _ => false,
        }
    }
}

/// Result type for synced-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::Timeout { op: "put" }.is_transient());
        assert!(StoreError::Remote(DbError::PoolExhausted).is_transient());

        assert!(!StoreError::Validation(ValidationError::Required {
            field: "name".to_string()
        })
        .is_transient());
        assert!(!StoreError::Remote(DbError::not_found("sales", "s1")).is_transient());
    }

    #[test]
    fn test_remote_failure_message_is_actionable() {
        let err = StoreError::Remote(DbError::PoolExhausted);
        assert_eq!(
            err.to_string(),
            "Remote operation failed: Connection pool exhausted"
        );
    }
}
