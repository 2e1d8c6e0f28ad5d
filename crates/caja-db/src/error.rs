//! # Document Store Error Types
//!
//! Error types for document store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (caja-store) ← RemoteOperationFailed, surfaced to caller   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UI displays a retryable, user-friendly message                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is ever logged-and-swallowed: every operation returns its
//! failure to the caller.

use thiserror::Error;

/// Document store operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Document not found in its collection.
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// A conditional write found its precondition unmet.
    ///
    /// ## When This Occurs
    /// - `decrement_if_at_least` on a stock field holding fewer units than
    ///   requested (another terminal committed first)
    #[error("precondition failed on {collection}/{id}.{field}: have {available}, need {requested}")]
    PreconditionFailed {
        collection: String,
        id: String,
        field: String,
        available: i64,
        requested: i64,
    },

    /// Field name is not addressable as a JSON path.
    ///
    /// Only plain identifiers are accepted; this keeps caller-supplied
    /// field names out of SQL string territory.
    #[error("invalid field name: {0}")]
    InvalidField(String),

    /// Stored document body failed to decode into the expected shape.
    #[error("failed to decode {collection}/{id}: {source}")]
    Decode {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a collection/id pair.
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Whether a bounded retry could plausibly succeed.
    ///
    /// Pool timeouts and short-lived SQLite lock contention are transient;
    /// everything else (missing documents, failed preconditions, decode
    /// errors) is terminal and must reach the caller unchanged.
    pub fn is_transient(&self) -> bool {
        match self {
            DbError::PoolExhausted | DbError::ConnectionFailed(_) => true,
            DbError::QueryFailed(msg) => {
                msg.contains("database is locked") || msg.contains("database table is locked")
            }
            _ => false,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound (context filled upstream)
/// sqlx::Error::Database       → DbError::QueryFailed with driver message
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                collection: "unknown".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for document store operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DbError::PoolExhausted.is_transient());
        assert!(DbError::QueryFailed("database is locked".to_string()).is_transient());

        assert!(!DbError::not_found("products", "p1").is_transient());
        assert!(!DbError::PreconditionFailed {
            collection: "products".to_string(),
            id: "p1".to_string(),
            field: "stock".to_string(),
            available: 1,
            requested: 2,
        }
        .is_transient());
    }
}
