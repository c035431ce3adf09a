//! # API Error Type
//!
//! Unified error type for CLI commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Cable Ledger                           │
//! │                                                                         │
//! │  cable-cli post sales draft.json                                        │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::QueryFailed("...") ──┐            │  │
//! │  │         │                                          │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Ledger Error? ─── CoreError::InsufficientStock ── ApiError ───►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  stdout: { "ok": false, "code": "INSUFFICIENT_STOCK",                   │
//! │            "message": "Insufficient stock for ... (short by 5)" }       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged in full and shown to the operator as a
//! generic message.

use cable_core::{CoreError, ValidationError};
use cable_db::{AuthFailure, DbError};
use serde::Serialize;
use tracing::{error, warn};

/// Error returned from CLI commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "REFERENCE_NOT_FOUND",
///   "message": "customer not found: Ali Traders"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes printed with failed outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Row looked up by id does not exist
    NotFound,

    /// Document references an unknown party, item, bank or invoice
    ReferenceNotFound,

    /// Input validation failed
    ValidationError,

    /// Outbound quantity exceeds stock on hand
    InsufficientStock,

    /// Return exceeds what the original document moved
    ReturnExceedsOriginal,

    /// Stock changed underneath the operation; safe to retry
    Conflict,

    /// Sign-in or password change refused
    AuthenticationFailed,

    /// Store could not be opened or written
    DatabaseError,

    /// Unexpected failure
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::ReferenceNotFound { entity, reference } => ApiError::new(
                ErrorCode::ReferenceNotFound,
                format!("{} not found: {}", entity, reference),
            ),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                warn!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ReferenceNotFound, "Invalid reference")
            }
            DbError::ConcurrentModification { entity, id } => {
                warn!(entity = %entity, id = %id, "Concurrent modification");
                ApiError::new(
                    ErrorCode::Conflict,
                    format!("{} {} changed while posting; try again", entity, id),
                )
            }
            DbError::AuthenticationFailed { username, reason } => {
                warn!(username = %username, reason = %reason, "Authentication failed");
                let message = match reason {
                    AuthFailure::UnknownUser => "Unknown user",
                    AuthFailure::WrongPassword => "Wrong password",
                };
                ApiError::new(ErrorCode::AuthenticationFailed, message)
            }
            DbError::ConnectionFailed(e) => {
                error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::SchemaFailed(e) => {
                error!("Schema initialization failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database schema could not be prepared")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Core(e) => ApiError::from(e),
            DbError::Internal(e) => {
                error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts ledger rule violations to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::ReturnExceedsOriginal { .. } => {
                ApiError::new(ErrorCode::ReturnExceedsOriginal, err.to_string())
            }
            CoreError::EmptyDocument { .. } => ApiError::validation(err.to_string()),
            CoreError::UnplannedStock { stock_id } => {
                error!(stock_id = %stock_id, "Movement for unplanned stock row");
                ApiError::internal("Document could not be planned")
            }
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
