//! # Transaction Codes
//!
//! Human-readable transaction identifiers of the form `PREFIX-YYYYMMDD-NNN`.
//!
//! ```text
//!   TRX-20240315-007
//!   ─┬─ ────┬─── ─┬─
//!    │      │     └── sequence within the UTC day, zero-padded to ≥ 3 digits
//!    │      └──────── UTC calendar date of created_at
//!    └─────────────── prefix from settings (1-10 ASCII alphanumerics)
//! ```
//!
//! This module only formats and parses. Picking the sequence (count the
//! day's transactions, add one, retry on a UNIQUE violation) happens inside
//! the engine's unit of work in tally-db.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::ValidationError;

/// Longest prefix accepted from settings.
pub const MAX_PREFIX_LEN: usize = 10;

/// Minimum width of the sequence part.
pub const SEQUENCE_WIDTH: usize = 3;

/// A parsed or freshly minted transaction code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionCode {
    prefix: String,
    date: NaiveDate,
    sequence: u32,
}

impl TransactionCode {
    /// Builds a code, validating the prefix.
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use tally_core::code::TransactionCode;
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    /// let code = TransactionCode::new("TRX", date, 3).unwrap();
    /// assert_eq!(code.to_string(), "TRX-20240315-003");
    /// ```
    pub fn new(prefix: &str, date: NaiveDate, sequence: u32) -> Result<Self, ValidationError> {
        validate_prefix(prefix)?;
        if sequence == 0 {
            return Err(ValidationError::MustBePositive {
                field: "sequence".to_string(),
            });
        }
        Ok(Self {
            prefix: prefix.to_string(),
            date,
            sequence,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for TransactionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{:0width$}",
            self.prefix,
            self.date.format("%Y%m%d"),
            self.sequence,
            width = SEQUENCE_WIDTH
        )
    }
}

impl FromStr for TransactionCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.splitn(3, '-');
        let (Some(prefix), Some(date), Some(seq)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected PREFIX-YYYYMMDD-NNN"));
        };

        let date = NaiveDate::parse_from_str(date, "%Y%m%d")
            .map_err(|_| invalid("date part must be YYYYMMDD"))?;

        if seq.len() < SEQUENCE_WIDTH || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("sequence must be at least 3 digits"));
        }
        let sequence = seq
            .parse::<u32>()
            .map_err(|_| invalid("sequence out of range"))?;

        TransactionCode::new(prefix, date, sequence)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Validates a code prefix: 1-10 ASCII letters or digits.
pub fn validate_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.is_empty() {
        return Err(ValidationError::Required {
            field: "transaction_code_prefix".to_string(),
        });
    }
    if prefix.len() > MAX_PREFIX_LEN {
        return Err(ValidationError::TooLong {
            field: "transaction_code_prefix".to_string(),
            max: MAX_PREFIX_LEN,
        });
    }
    if !prefix.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "transaction_code_prefix".to_string(),
            reason: "must contain only ASCII letters and digits".to_string(),
        });
    }
    Ok(())
}

/// Half-open UTC bounds `[start, start + 1 day)` of the calendar day
/// containing `at`.
pub fn day_bounds(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = at.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn test_format_pads_to_three_digits() {
        assert_eq!(TransactionCode::new("TRX", date(), 1).unwrap().to_string(), "TRX-20240315-001");
        assert_eq!(TransactionCode::new("TRX", date(), 42).unwrap().to_string(), "TRX-20240315-042");
        assert_eq!(TransactionCode::new("TRX", date(), 1234).unwrap().to_string(), "TRX-20240315-1234");
    }

    #[test]
    fn test_parse() {
        let code: TransactionCode = "INV-20240315-017".parse().unwrap();
        assert_eq!(code.prefix(), "INV");
        assert_eq!(code.date(), date());
        assert_eq!(code.sequence(), 17);

        assert!("TRX-2024-001".parse::<TransactionCode>().is_err());
        assert!("TRX-20240315-01".parse::<TransactionCode>().is_err());
        assert!("TRX-20240315".parse::<TransactionCode>().is_err());
        assert!("T-X-20240315-001".parse::<TransactionCode>().is_err());
    }

    #[test]
    fn test_prefix_rules() {
        assert!(validate_prefix("TRX").is_ok());
        assert!(validate_prefix("Shop01").is_ok());
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("TOOLONGPREFIX").is_err());
        assert!(validate_prefix("TR-X").is_err());
        assert!(validate_prefix("TRÜ").is_err());
    }

    #[test]
    fn test_zero_sequence_rejected() {
        assert!(TransactionCode::new("TRX", date(), 0).is_err());
    }

    #[test]
    fn test_day_bounds() {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 59).unwrap();
        let (start, end) = day_bounds(at);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap());
        assert!(start <= at && at < end);
    }
}
