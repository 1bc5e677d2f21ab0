//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │   Transaction   │   │ TransactionItem │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name           │   │  code (business)│   │  transaction_id │       │
//! │  │  selling_price  │   │  status         │   │  unit_price     │       │
//! │  │  stock_quantity │   │  total_amount   │   │  line_total     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │TransactionStatus│   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Completed      │   │  Cash           │       │
//! │  │  825 = 8.25%    │   │  Cancelled      │   │  Card           │       │
//! │  └─────────────────┘   │  Refunded       │   │  Mobile         │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (transaction code, username, barcode) - human-readable

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::MAX_PAGE_LIMIT;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 825 bps = 8.25%, 1100 bps = 11% (PPN)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage, e.g. `dec!(8.25)`.
    ///
    /// Returns `None` for negative or out-of-range percentages and for
    /// percentages with more than two fraction digits.
    pub fn from_percentage(pct: Decimal) -> Option<Self> {
        let bps = pct * Decimal::ONE_HUNDRED;
        if bps.is_sign_negative() || !bps.fract().is_zero() {
            return None;
        }
        bps.to_u32().map(TaxRate)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a fraction (825 bps → 0.0825).
    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 4)
    }

    /// Returns the rate as a percentage (825 bps → 8.25).
    pub fn percentage(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 2)
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Category & User
// =============================================================================

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Role of a user account. Access decisions are made outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Cashier,
}

/// A user who can record transactions.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Weak reference: a referenced category cannot be deleted.
    pub category_id: Option<String>,

    /// What the shop paid per unit.
    #[ts(type = "number")]
    pub purchase_price: Money,

    /// Price charged per unit; snapshotted onto each line at sale time.
    #[ts(type = "number")]
    pub selling_price: Money,

    /// Units on hand. Never negative.
    pub stock_quantity: i64,

    /// At or below this level the product is reported as low stock.
    pub low_stock_threshold: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Checks if the current stock is at or below the threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.low_stock_threshold
    }

    /// Checks if `quantity` units can be sold right now.
    ///
    /// Advisory only: the ledger re-checks atomically when it decrements.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && quantity > 0 && self.stock_quantity >= quantity
    }
}

/// Product state captured by the ledger at the moment stock was reserved.
///
/// `stock_before` is the quantity immediately before this reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub product_id: String,
    pub name: String,
    pub selling_price: Money,
    pub stock_before: i64,
    pub low_stock_threshold: i64,
}

impl StockSnapshot {
    /// Stock remaining once `quantity` units are taken.
    #[inline]
    pub fn stock_after(&self, quantity: i64) -> i64 {
        self.stock_before - quantity
    }

    /// Whether taking `quantity` units leaves the product at or below its threshold.
    #[inline]
    pub fn is_low_after(&self, quantity: i64) -> bool {
        self.stock_after(quantity) <= self.low_stock_threshold
    }
}

// =============================================================================
// Transaction Status
// =============================================================================

/// The status of a transaction.
///
/// ## State Machine
/// ```text
///                 cancel
///   ┌───────────┐ ───────► ┌───────────┐
///   │ completed │          │ cancelled │  (terminal)
///   └───────────┘ ───────► └───────────┘
///                 refund   ┌───────────┐
///                 └──────► │ refunded  │  (terminal)
///                          └───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Paid and recorded. The only state a transaction is created in.
    Completed,
    /// Voided at the register; stock restored.
    Cancelled,
    /// Returned after the fact; stock restored.
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Cancelled => "cancelled",
            TransactionStatus::Refunded => "refunded",
        }
    }

    /// Cancelled and refunded are terminal.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Completed)
    }

    /// Checks whether the state machine allows `self → next`.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Completed, TransactionStatus::Cancelled)
                | (TransactionStatus::Completed, TransactionStatus::Refunded)
        )
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Completed
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(TransactionStatus::Completed),
            "cancelled" => Ok(TransactionStatus::Cancelled),
            "refunded" => Ok(TransactionStatus::Refunded),
            other => Err(format!("unknown transaction status: {other}")),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Debit/credit card on an external terminal.
    Card,
    /// QR / e-wallet payment.
    Mobile,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Mobile => "mobile",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A recorded sale.
///
/// `discount_amount` is the combined figure: every line discount plus the
/// transaction-level discount.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    /// `PREFIX-YYYYMMDD-NNN`, unique.
    pub code: String,
    pub user_id: String,
    #[ts(type = "number")]
    pub subtotal: Money,
    #[ts(type = "number")]
    pub discount_amount: Money,
    #[ts(type = "number")]
    pub tax_amount: Money,
    #[ts(type = "number")]
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    pub notes: Option<String>,
    /// Immutable. Basis for the code date and reporting periods.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Transaction Item
// =============================================================================

/// A line item in a transaction.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Selling price at time of sale (frozen).
    #[ts(type = "number")]
    pub unit_price: Money,
    #[ts(type = "number")]
    pub discount: Money,
    /// `max(0, unit_price × quantity − discount)`.
    #[ts(type = "number")]
    pub line_total: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Requests
// =============================================================================

/// One requested line of a cart.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineRequest {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    #[ts(type = "number")]
    pub discount: Money,
}

/// Input for creating a transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateTransaction {
    pub user_id: String,
    pub lines: Vec<LineRequest>,
    #[serde(default)]
    #[ts(type = "number")]
    pub transaction_discount: Money,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Filters for listing transactions. Absent filters match everything.
///
/// `from` and `to` are inclusive bounds on `created_at`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct TransactionFilter {
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub status: Option<TransactionStatus>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl TransactionFilter {
    /// Page size the caller asked for, capped. `None` means every row.
    pub fn effective_limit(&self) -> Option<i64> {
        self.limit.map(|limit| limit.clamp(1, MAX_PAGE_LIMIT))
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(825);
        assert_eq!(rate.bps(), 825);
        assert_eq!(rate.percentage(), dec!(8.25));
        assert_eq!(rate.as_fraction(), dec!(0.0825));
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(dec!(8.25)), Some(TaxRate::from_bps(825)));
        assert_eq!(TaxRate::from_percentage(dec!(11)), Some(TaxRate::from_bps(1100)));
        assert_eq!(TaxRate::from_percentage(dec!(-1)), None);
        assert_eq!(TaxRate::from_percentage(dec!(8.255)), None);
    }

    #[test]
    fn test_status_transitions() {
        use TransactionStatus::*;

        assert!(Completed.can_transition_to(Cancelled));
        assert!(Completed.can_transition_to(Refunded));
        assert!(!Cancelled.can_transition_to(Refunded));
        assert!(!Refunded.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Completed));

        assert!(!Completed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(Refunded.is_terminal());
    }

    #[test]
    fn test_status_parse_and_display() {
        for status in [
            TransactionStatus::Completed,
            TransactionStatus::Cancelled,
            TransactionStatus::Refunded,
        ] {
            assert_eq!(status.to_string().parse::<TransactionStatus>().unwrap(), status);
        }
        assert!("voided".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_stock_snapshot_low_after() {
        let snap = StockSnapshot {
            product_id: "p".into(),
            name: "Teh Botol".into(),
            selling_price: Money::from_cents(500),
            stock_before: 10,
            low_stock_threshold: 3,
        };
        assert_eq!(snap.stock_after(4), 6);
        assert!(!snap.is_low_after(6));
        assert!(snap.is_low_after(7));
    }

    #[test]
    fn test_filter_limits() {
        let f = TransactionFilter::default();
        assert_eq!(f.effective_limit(), None);
        assert_eq!(f.effective_offset(), 0);

        let f = TransactionFilter {
            limit: Some(10_000),
            offset: Some(-5),
            ..Default::default()
        };
        assert_eq!(f.effective_limit(), Some(MAX_PAGE_LIMIT));
        assert_eq!(f.effective_offset(), 0);

        let f = TransactionFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(f.effective_limit(), Some(1));
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateTransaction = serde_json::from_str(
            r#"{"user_id":"u","lines":[{"product_id":"p","quantity":2}],"payment_method":"cash"}"#,
        )
        .unwrap();
        assert!(req.transaction_discount.is_zero());
        assert!(req.lines[0].discount.is_zero());
        assert!(req.notes.is_none());
        assert_eq!(req.payment_method, PaymentMethod::Cash);
    }
}
