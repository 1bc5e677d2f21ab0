//! # Validation Module
//!
//! Input validation utilities for Tally POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Browser client (TypeScript)                                  │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: RPC handler + engine (Rust)                                  │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: Business rule validation, before any unit of work    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock_quantity >= 0), CHECK (quantity > 0)                 │
//! │  ├── UNIQUE (transactions.code)                                        │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_product_name, validate_quantity};
//!
//! validate_product_name("Kopi Susu 250ml").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::CreateTransaction;
use crate::{MAX_AMOUNT_UNITS, MAX_ITEM_QUANTITY, MAX_LINE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest free-text note stored on a transaction.
pub const MAX_NOTES_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 200 characters
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Teh Botol 350ml").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_required_text("name", name, 200)
}

/// Validates any required display name (1-200 characters), e.g. a user's full name.
pub fn validate_required_name(field: &str, value: &str) -> ValidationResult<()> {
    validate_required_text(field, value, 200)
}

/// Validates a category name (1-100 characters).
pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    validate_required_text("name", name, 100)
}

/// Validates a username.
///
/// ## Rules
/// - 3 to 50 characters
/// - ASCII letters, digits, `.`, `_` and `-` only
pub fn validate_username(username: &str) -> ValidationResult<()> {
    validate_required_text("username", username, 50)?;

    if username.len() < 3 {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must be at least 3 characters".to_string(),
        });
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, numbers, dots, hyphens, and underscores"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates optional transaction notes.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    match notes {
        Some(n) if n.chars().count() > MAX_NOTES_LEN => Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Checkout: line quantity                                                │
/// │                                                                         │
/// │  Cashier enters quantity: 5                                            │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"     │
/// │       │                                                                 │
/// │       └── OK → line goes to the engine                                 │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or discount: zero is allowed, negatives are not,
/// and the amount may not exceed [`Money::max`].
///
/// ## Example
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative("price", Money::from_cents(1099)).is_ok());
/// assert!(validate_non_negative("price", Money::zero()).is_ok());
/// assert!(validate_non_negative("price", Money::from_cents(-100)).is_err());
/// assert!(validate_non_negative("price", Money::max()).is_ok());
/// ```
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if !amount.is_within_limit() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_UNITS,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: i64) -> ValidationResult<()> {
    if !(0..=10_000).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate_bps".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string, naming the offending field in the error.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_uuid;
///
/// assert!(validate_uuid("user_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("user_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates a whole create-transaction request before any I/O.
///
/// ## Rules
/// - `user_id` and every `product_id` are UUIDs
/// - 1 to MAX_LINE_ITEMS (100) lines
/// - every quantity passes [`validate_quantity`]
/// - line discounts and the transaction discount are ≥ 0 and at most [`Money::max`]
/// - notes are at most 500 characters
pub fn validate_create_transaction(req: &CreateTransaction) -> ValidationResult<()> {
    validate_uuid("user_id", &req.user_id)?;

    if req.lines.is_empty() {
        return Err(ValidationError::Empty {
            field: "lines".to_string(),
        });
    }

    if req.lines.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    for (i, line) in req.lines.iter().enumerate() {
        validate_uuid(&format!("lines[{i}].product_id"), &line.product_id)?;
        validate_quantity(line.quantity).map_err(|e| relabel(e, &format!("lines[{i}].quantity")))?;
        validate_non_negative(&format!("lines[{i}].discount"), line.discount)?;
    }

    validate_non_negative("transaction_discount", req.transaction_discount)?;
    validate_notes(req.notes.as_deref())?;

    Ok(())
}

/// Replaces the field name of a validation error.
fn relabel(err: ValidationError, field: &str) -> ValidationError {
    let field = field.to_string();
    match err {
        ValidationError::Required { .. } => ValidationError::Required { field },
        ValidationError::TooLong { max, .. } => ValidationError::TooLong { field, max },
        ValidationError::OutOfRange { min, max, .. } => {
            ValidationError::OutOfRange { field, min, max }
        }
        ValidationError::MustBePositive { .. } => ValidationError::MustBePositive { field },
        ValidationError::MustNotBeNegative { .. } => ValidationError::MustNotBeNegative { field },
        ValidationError::InvalidFormat { reason, .. } => {
            ValidationError::InvalidFormat { field, reason }
        }
        ValidationError::Empty { .. } => ValidationError::Empty { field },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
