//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Domain taxonomy of the transaction engine      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  ├── LedgerError      - Stock reservation outcomes                     │
//! │  └── EngineError      - CoreError | DbError                            │
//! │                                                                         │
//! │  apps/api                                                              │
//! │  └── ApiError         - What the browser sees (code + message)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::TransactionStatus;

// =============================================================================
// Reversal Kind
// =============================================================================

/// Which reversal was attempted on a transaction.
///
/// Carried by [`CoreError::InvalidTransactionStatus`] so the message reads
/// "cannot cancel" or "cannot refund" depending on the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversalKind {
    Cancel,
    Refund,
}

impl ReversalKind {
    /// The status a successful reversal of this kind leaves behind.
    pub fn target_status(self) -> TransactionStatus {
        match self {
            ReversalKind::Cancel => TransactionStatus::Cancelled,
            ReversalKind::Refund => TransactionStatus::Refunded,
        }
    }
}

impl fmt::Display for ReversalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReversalKind::Cancel => write!(f, "cancel"),
            ReversalKind::Refund => write!(f, "refund"),
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant is a distinguishable failure kind that the API maps to a
/// stable code and message. None of them is ever downgraded to a generic
/// failure.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but has been deactivated and cannot be sold.
    #[error("Product {0} is inactive and cannot be sold")]
    ProductInactive(String),

    /// User recording the transaction does not exist (or is inactive).
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Transaction cannot be found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Insufficient stock to complete a sale.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5)
    ///      │
    ///      ▼
    /// Reserve stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Kopi Susu", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Cashier retries with a lower quantity
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        product: String,
        available: i64,
        requested: i64,
    },

    /// Reversal attempted on a transaction that is no longer `completed`.
    #[error("Cannot {operation} transaction {transaction_id}: status is {status}")]
    InvalidTransactionStatus {
        transaction_id: String,
        status: TransactionStatus,
        operation: ReversalKind,
    },

    /// Every attempt to mint a unique transaction code collided.
    #[error("Could not generate a unique transaction code after {attempts} attempts")]
    CodeGenerationExhausted { attempts: u32 },

    /// The unit of work kept hitting write conflicts.
    #[error("{operation} could not commit after {attempts} attempts due to concurrent writes")]
    ConflictRetryExhausted {
        operation: &'static str,
        attempts: u32,
    },

    /// The unit of work did not finish before its deadline.
    #[error("{operation} did not complete within {millis} ms")]
    DeadlineExceeded {
        operation: &'static str,
        millis: u64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any unit of work starts.
#[derive(Debug, Error)]
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

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, too many decimals).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A collection that must contain something is empty.
    #[error("{field} must not be empty")]
    Empty { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
