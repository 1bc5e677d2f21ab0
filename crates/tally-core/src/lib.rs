//! # tally-core: Pure Business Logic for Tally POS
//!
//! This crate contains every rule of the sale path that can be expressed
//! without I/O: money arithmetic, cart pricing, transaction code formatting,
//! status transitions and input validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Browser client                               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON RPC                               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/api (axum handlers)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        tally-db (Inventory Ledger, Transaction Engine)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ calls into                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │   types · money · pricing · code · validation · error           │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Transaction, TransactionItem, ...)
//! - [`money`] - Fixed-point `Money` with exactly two fraction digits
//! - [`pricing`] - Cart → subtotal / discount / tax / total
//! - [`code`] - `PREFIX-YYYYMMDD-NNN` transaction codes
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::pricing::{calculate_totals, PricingLine};
//! use tally_core::types::TaxRate;
//!
//! let lines = [PricingLine::new("19.99".parse().unwrap(), 2, "1.00".parse().unwrap())];
//! let totals = calculate_totals(&lines, "2.00".parse().unwrap(), TaxRate::zero()).unwrap();
//!
//! assert_eq!(totals.subtotal.to_string(), "38.98");
//! assert_eq!(totals.discount_amount.to_string(), "3.00");
//! assert_eq!(totals.total_amount.to_string(), "36.98");
//! ```

pub mod code;
pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

pub use code::TransactionCode;
pub use error::{CoreError, CoreResult, ReversalKind, ValidationError};
pub use money::Money;
pub use pricing::{calculate_totals, PricedLine, PricingLine, Totals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of line items in a single transaction.
pub const MAX_LINE_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Guards against typing 1000 instead of 10 at the register.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest whole-unit value a single price or discount may carry.
///
/// Keeps every cart total far inside `Decimal`'s range, so pricing
/// arithmetic cannot overflow.
pub const MAX_AMOUNT_UNITS: i64 = 999_999_999_999;

/// Prefix used for transaction codes when the settings store has none.
pub const DEFAULT_CODE_PREFIX: &str = "TRX";

/// Largest page a single listing call may request.
pub const MAX_PAGE_LIMIT: i64 = 500;
