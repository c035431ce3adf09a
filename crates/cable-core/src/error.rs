//! # Error Types
//!
//! Domain-specific error types for cable-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cable-core errors (this file)                                         │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  cable-db errors (separate crate)                                      │
//! │  └── DbError          - Store failures, wraps CoreError                │
//! │                                                                         │
//! │  cable-cli errors (in app)                                             │
//! │  └── ApiError         - What the operator sees                         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Terminal     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
///
/// Any of these aborts the enclosing ledger operation before a single row
/// is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Outbound quantity exceeds what is on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// Sales invoice: "Copper 10mm" qty 10
    ///      │
    ///      ▼
    /// Plan movement: on hand = 5
    ///      │
    ///      ▼
    /// InsufficientStock { item: "Copper 10mm", available: 5, requested: 10 }
    ///      │
    ///      ▼
    /// Nothing written, operator sees "short by 5"
    /// ```
    #[error("Insufficient stock for {item}: available {available}, requested {requested} (short by {})", .requested - .available)]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// A return document gives back more than its original document moved.
    #[error("Return of {item} exceeds original document {invoice}: original {original}, already returned {returned}, requested {requested}")]
    ReturnExceedsOriginal {
        item: String,
        invoice: String,
        original: i64,
        returned: i64,
        requested: i64,
    },

    /// A document has no line items.
    #[error("{document} has no line items")]
    EmptyDocument { document: String },

    /// A movement references a stock row that was not loaded for planning.
    #[error("Stock item {stock_id} was not loaded for this document")]
    UnplannedStock { stock_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shortfall for an insufficient stock error.
    pub fn shortfall(&self) -> Option<i64> {
        match self {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => Some(requested - available),
            _ => None,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed invoice number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Field is not allowed for this document kind.
    #[error("{field} is not allowed on {document}")]
    NotAllowed { field: String, document: String },
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn must_be_positive(field: &str) -> Self {
        ValidationError::MustBePositive {
            field: field.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message_names_shortfall() {
        let err = CoreError::InsufficientStock {
            item: "Copper 10mm".to_string(),
            available: 5,
            requested: 10,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Copper 10mm: available 5, requested 10 (short by 5)"
        );
        assert_eq!(err.shortfall(), Some(5));
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("supplier");
        assert_eq!(err.to_string(), "supplier is required");

        let err = ValidationError::NotAllowed {
            field: "paid amount".to_string(),
            document: "raw use invoice".to_string(),
        };
        assert_eq!(err.to_string(), "paid amount is not allowed on raw use invoice");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::must_be_positive("quantity").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.shortfall(), None);
    }
}
