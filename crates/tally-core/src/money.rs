//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: base-10 fixed point, exactly 2 fraction digits           │
//! │    Decimal("0.10") + Decimal("0.20") = Decimal("0.30")                  │
//! │                                                                         │
//! │  Storage:  TEXT "38.98"   (round-trips exactly)                         │
//! │  RPC:      JSON number 38.98                                            │
//! │  Math:     rust_decimal::Decimal, never f64                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let price: Money = "19.99".parse().unwrap();
//! let line = price.multiply_quantity(2);
//! assert_eq!(line.to_string(), "39.98");
//!
//! let cents = Money::from_cents(1099);
//! assert_eq!(cents.to_string(), "10.99");
//! ```

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::TaxRate;
use crate::MAX_AMOUNT_UNITS;

/// Number of fraction digits every `Money` value carries.
pub const MONEY_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount with exactly two fraction digits.
///
/// ## Invariant
/// The inner decimal always has scale 2. Every constructor goes through
/// [`Money::new`], which rounds half away from zero and rescales, so the
/// string form is always `"<int>.<2 digits>"`.
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.selling_price ──► TransactionItem.unit_price (snapshot)       │
/// │                                  │                                      │
/// │                                  ▼                                      │
/// │                         TransactionItem.line_total                     │
/// │                                  │                                      │
/// │                                  ▼                                      │
/// │  Transaction.subtotal ─► discount ─► tax ─► Transaction.total_amount   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    /// Creates a Money value from any decimal, normalizing to 2 places.
    ///
    /// Rounds half away from zero: `1.005 → 1.01`, `-1.005 → -1.01`.
    pub fn new(amount: Decimal) -> Self {
        let mut rounded =
            amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(MONEY_SCALE);
        Money(rounded)
    }

    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
    /// ```
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, MONEY_SCALE))
    }

    /// Largest accepted amount: `999999999999.99`.
    #[inline]
    pub fn max() -> Self {
        Money(Decimal::new(MAX_AMOUNT_UNITS * 100 + 99, MONEY_SCALE))
    }

    /// True when the magnitude does not exceed [`Money::max`].
    #[inline]
    pub fn is_within_limit(&self) -> bool {
        self.0.abs() <= Money::max().0
    }

    /// Zero money value.
    #[inline]
    pub fn zero() -> Self {
        Money(Decimal::new(0, MONEY_SCALE))
    }

    /// Returns the underlying decimal.
    #[inline]
    pub fn amount(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Clamps negative amounts to zero.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-100).clamp_non_negative(), Money::zero());
    /// assert_eq!(Money::from_cents(100).clamp_non_negative(), Money::from_cents(100));
    /// ```
    #[inline]
    pub fn clamp_non_negative(self) -> Self {
        if self.is_negative() {
            Money::zero()
        } else {
            self
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Product: Kopi Susu 19.99
    /// Quantity: 2
    ///      │
    ///      ▼
    /// multiply_quantity(2) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Gross line amount: 39.98
    /// ```
    #[inline]
    pub fn multiply_quantity(&self, qty: i64) -> Self {
        Money::new(self.0 * Decimal::from(qty))
    }

    /// Calculates tax on this amount, rounding half away from zero.
    ///
    /// Negative amounts produce zero tax.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::types::TaxRate;
    ///
    /// let amount = Money::from_cents(1000);  // 10.00
    /// let tax = amount.calculate_tax(TaxRate::from_bps(825)); // 8.25%
    /// // 10.00 × 8.25% = 0.825 → 0.83
    /// assert_eq!(tax.to_string(), "0.83");
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        if rate.is_zero() || !self.is_positive() {
            return Money::zero();
        }
        Money::new(self.0 * rate.as_fraction())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Always prints two fraction digits with no currency symbol: `"38.98"`.
///
/// This is also the storage form, so it must stay stable.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim())?;
        if amount.abs() > Money::max().0 {
            return Err(rust_decimal::Error::ExceedsMaximumPossibleValue);
        }
        Ok(Money::new(amount))
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money::new(amount)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money::new(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money::new(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Serde: JSON numbers at the RPC boundary
// =============================================================================
//
// The browser client sends and receives plain numbers (`38.98`). Incoming
// numbers are converted through their shortest decimal representation, so
// `19.99` becomes Decimal("19.99") and never 19.989999999999998.

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Parsing the 2dp string yields the double nearest to the exact amount
        let value: f64 = self.to_string().parse().map_err(|_| {
            serde::ser::Error::custom(format!(
                "money amount {} cannot be represented as a number",
                self.0
            ))
        })?;
        serializer.serialize_f64(value)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal amount as a number or string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        bounded(Decimal::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        bounded(Decimal::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        if !v.is_finite() {
            return Err(E::custom("money amount must be finite"));
        }
        // f64's Display is the shortest string that round-trips
        let amount = Decimal::from_str(&v.to_string())
            .map_err(|e| E::custom(format!("invalid money amount {v}: {e}")))?;
        bounded(amount)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        v.parse()
            .map_err(|e| E::custom(format!("invalid money amount {v:?}: {e}")))
    }
}

fn bounded<E: de::Error>(amount: Decimal) -> Result<Money, E> {
    let money = Money::new(amount);
    if !money.is_within_limit() {
        return Err(E::custom(format!(
            "money amount {amount} exceeds the maximum of {}",
            Money::max()
        )));
    }
    Ok(money)
}

// =============================================================================
// SQLite TEXT encoding
// =============================================================================

#[cfg(feature = "sqlx")]
mod sqlite {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::Money;

    use sqlx::encode::IsNull;
    use sqlx::error::BoxDynError;
    use sqlx::sqlite::{Sqlite, SqliteTypeInfo};
    use sqlx::{Database, Decode, Encode, Type};

    impl Type<Sqlite> for Money {
        fn type_info() -> SqliteTypeInfo {
            <String as Type<Sqlite>>::type_info()
        }

        fn compatible(ty: &SqliteTypeInfo) -> bool {
            <String as Type<Sqlite>>::compatible(ty)
        }
    }

    impl<'q> Encode<'q, Sqlite> for Money {
        fn encode_by_ref(
            &self,
            buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
        ) -> Result<IsNull, BoxDynError> {
            <String as Encode<'q, Sqlite>>::encode(self.to_string(), buf)
        }
    }

    impl<'r> Decode<'r, Sqlite> for Money {
        fn decode(value: <Sqlite as Database>::ValueRef<'r>) -> Result<Self, BoxDynError> {
            let text = <&str as Decode<Sqlite>>::decode(value)?;
            // stored totals may legitimately exceed the input bound
            Ok(Money::new(Decimal::from_str(text.trim())?))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
