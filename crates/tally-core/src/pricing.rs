//! # Pricing & Totals
//!
//! Turns priced cart lines into the four money figures stored on a
//! transaction. Pure: no I/O, no clock, no database.
//!
//! ## Calculation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per line:   line_total = max(0, unit_price × qty − line_discount)     │
//! │                                                                         │
//! │  subtotal        = Σ line_total                                        │
//! │  discount_amount = Σ line_discount + transaction_discount              │
//! │  taxable         = max(0, subtotal − transaction_discount)             │
//! │  tax_amount      = round_2dp(taxable × rate)                           │
//! │  total_amount    = taxable + tax_amount                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `discount_amount` is the combined figure so one field communicates the
//! total savings on the receipt.

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::TaxRate;
use crate::validation::{validate_non_negative, validate_quantity};

// =============================================================================
// Input / Output
// =============================================================================

/// One cart line with its price already resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingLine {
    pub unit_price: Money,
    pub quantity: i64,
    pub discount: Money,
}

impl PricingLine {
    pub fn new(unit_price: Money, quantity: i64, discount: Money) -> Self {
        Self {
            unit_price,
            quantity,
            discount,
        }
    }
}

/// A line after pricing, in input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Money,
    pub quantity: i64,
    pub discount: Money,
    pub line_total: Money,
}

/// Totals for a whole cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub lines: Vec<PricedLine>,
}

// =============================================================================
// Calculator
// =============================================================================

/// Prices a single line.
///
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::pricing::line_total;
///
/// // over-discounted lines clamp to zero
/// assert_eq!(line_total(Money::from_cents(100), 1, Money::from_cents(500)), Money::zero());
/// ```
pub fn line_total(unit_price: Money, quantity: i64, discount: Money) -> Money {
    (unit_price.multiply_quantity(quantity) - discount).clamp_non_negative()
}

/// Computes subtotal, combined discount, tax and total for a cart.
///
/// ## Errors
/// - `MustBePositive` for a line with quantity ≤ 0
/// - `MustNotBeNegative` for a negative unit price, line discount, or
///   transaction discount
/// - `OutOfRange` for a quantity above 999 or an amount above [`Money::max`]
///
/// An empty cart prices to all zeros; rejecting empty carts is the
/// engine's job.
pub fn calculate_totals(
    lines: &[PricingLine],
    transaction_discount: Money,
    tax_rate: TaxRate,
) -> Result<Totals, ValidationError> {
    validate_non_negative("transaction_discount", transaction_discount)?;

    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal = Money::zero();
    let mut line_discounts = Money::zero();

    for (i, line) in lines.iter().enumerate() {
        // bounded inputs keep every sum below Decimal's range
        validate_quantity(line.quantity).map_err(|e| match e {
            ValidationError::OutOfRange { min, max, .. } => ValidationError::OutOfRange {
                field: format!("lines[{i}].quantity"),
                min,
                max,
            },
            _ => ValidationError::MustBePositive {
                field: format!("lines[{i}].quantity"),
            },
        })?;
        validate_non_negative(&format!("lines[{i}].unit_price"), line.unit_price)?;
        validate_non_negative(&format!("lines[{i}].discount"), line.discount)?;

        let total = line_total(line.unit_price, line.quantity, line.discount);
        subtotal += total;
        line_discounts += line.discount;
        priced.push(PricedLine {
            unit_price: line.unit_price,
            quantity: line.quantity,
            discount: line.discount,
            line_total: total,
        });
    }

    let taxable = (subtotal - transaction_discount).clamp_non_negative();
    let tax_amount = taxable.calculate_tax(tax_rate);

    Ok(Totals {
        subtotal,
        discount_amount: line_discounts + transaction_discount,
        tax_amount,
        total_amount: taxable + tax_amount,
        lines: priced,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
