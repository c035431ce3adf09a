//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        CoreError (ledger rules)            │
//! │       │                                 │                               │
//! │       ▼                                 ▼                               │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├── kind() → ErrorKind (Connection, ReferenceNotFound, ...)      │
//! │       ▼                                                                 │
//! │  ApiError (in cable-cli) ← ok/alert for the operator                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use cable_core::CoreError;
use serde::Serialize;
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and ledger rule violations, and provide
/// additional context for logging and operator feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A document references something that does not exist.
    ///
    /// ## When This Occurs
    /// - Supplier/customer name unknown
    /// - Stock item `(name, brand)` unknown on an outbound line
    /// - Original invoice of a return unknown
    #[error("{entity} not found: {reference}")]
    ReferenceNotFound { entity: String, reference: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate brand/supplier/customer name
    /// - Duplicate invoice number
    /// - Duplicate username
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created or opened
    /// - Pragmas rejected
    /// - Pool already closed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Schema initialization failed.
    #[error("Schema initialization failed: {0}")]
    SchemaFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A stock row changed between read and write.
    ///
    /// ## When This Occurs
    /// Another writer posted against the same stock item while this
    /// operation was in flight. Nothing was committed; retrying is safe.
    #[error("{entity} {id} was modified concurrently")]
    ConcurrentModification { entity: String, id: String },

    /// Sign-in or password change refused.
    #[error("Authentication failed for '{username}': {reason}")]
    AuthenticationFailed { username: String, reason: AuthFailure },

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Ledger rule violation (insufficient stock, validation, ...).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Why an authentication attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailure {
    UnknownUser,
    WrongPassword,
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthFailure::UnknownUser => f.write_str("unknown user"),
            AuthFailure::WrongPassword => f.write_str("wrong password"),
        }
    }
}

/// Coarse error categories shown at the UI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    ReferenceNotFound,
    InsufficientStock,
    Persistence,
    Authentication,
    Validation,
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a ReferenceNotFound error.
    pub fn missing_reference(entity: impl Into<String>, reference: impl Into<String>) -> Self {
        DbError::ReferenceNotFound {
            entity: entity.into(),
            reference: reference.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Category of this error.
    ///
    /// ## Mapping
    /// ```text
    /// ConnectionFailed, PoolExhausted          → Connection
    /// ReferenceNotFound, NotFound              → ReferenceNotFound
    /// Core(InsufficientStock)                  → InsufficientStock
    /// Core(anything else)                      → Validation
    /// AuthenticationFailed                     → Authentication
    /// everything else                          → Persistence
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => ErrorKind::Connection,
            DbError::ReferenceNotFound { .. } | DbError::NotFound { .. } => {
                ErrorKind::ReferenceNotFound
            }
            DbError::Core(CoreError::InsufficientStock { .. }) => ErrorKind::InsufficientStock,
            DbError::Core(CoreError::UnplannedStock { .. }) => ErrorKind::ReferenceNotFound,
            DbError::Core(_) => ErrorKind::Validation,
            DbError::AuthenticationFailed { .. } => ErrorKind::Authentication,
            DbError::UniqueViolation { .. }
            | DbError::ForeignKeyViolation { .. }
            | DbError::SchemaFailed(_)
            | DbError::QueryFailed(_)
            | DbError::TransactionFailed(_)
            | DbError::ConcurrentModification { .. }
            | DbError::Internal(_) => ErrorKind::Persistence,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::Io / Tls       → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error codes for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") {
                    DbError::TransactionFailed(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err: DbError = CoreError::InsufficientStock {
            item: "Copper 10mm".to_string(),
            available: 5,
            requested: 10,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Copper 10mm: available 5, requested 10 (short by 5)"
        );

        assert_eq!(
            DbError::missing_reference("supplier", "Nobody").kind(),
            ErrorKind::ReferenceNotFound
        );
        assert_eq!(
            DbError::ConnectionFailed("disk".to_string()).kind(),
            ErrorKind::Connection
        );
        assert_eq!(
            DbError::duplicate("brands.name", "Fast").kind(),
            ErrorKind::Persistence
        );
    }

    #[test]
    fn test_authentication_failure_is_specific() {
        let err = DbError::AuthenticationFailed {
            username: "admin".to_string(),
            reason: AuthFailure::WrongPassword,
        };
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(err.to_string(), "Authentication failed for 'admin': wrong password");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
