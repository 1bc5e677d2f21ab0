//! # Settings Repository
//!
//! Key/value business settings read by the engine.
//!
//! | key                       | default | meaning                         |
//! |---------------------------|---------|---------------------------------|
//! | `tax_rate_bps`            | `0`     | tax rate in basis points        |
//! | `transaction_code_prefix` | `TRX`   | prefix of transaction codes     |
//!
//! The typed readers are generic over the executor so the engine can read
//! them inside its open unit of work.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::code::validate_prefix;
use tally_core::validation::validate_tax_rate_bps;
use tally_core::{TaxRate, ValidationError, DEFAULT_CODE_PREFIX};

pub const TAX_RATE_BPS: &str = "tax_rate_bps";
pub const TRANSACTION_CODE_PREFIX: &str = "transaction_code_prefix";

/// Repository for settings.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Reads a raw value.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        get_value(&self.pool, key).await
    }

    /// Writes a value, validating the keys the engine depends on.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        match key {
            TAX_RATE_BPS => {
                parse_tax_rate(value)?;
            }
            TRANSACTION_CODE_PREFIX => validate_prefix(value)?,
            _ => {}
        }

        debug!(key = %key, value = %value, "Updating setting");

        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Current tax rate. Zero when unset.
    pub async fn tax_rate(&self) -> DbResult<TaxRate> {
        tax_rate(&self.pool).await
    }

    /// Current transaction code prefix. `TRX` when unset.
    pub async fn code_prefix(&self) -> DbResult<String> {
        code_prefix(&self.pool).await
    }
}

// =============================================================================
// Executor-generic readers
// =============================================================================

pub async fn get_value<'e, E>(executor: E, key: &str) -> DbResult<Option<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(executor)
        .await?;

    Ok(value)
}

pub async fn tax_rate<'e, E>(executor: E) -> DbResult<TaxRate>
where
    E: Executor<'e, Database = Sqlite>,
{
    match get_value(executor, TAX_RATE_BPS).await? {
        Some(raw) => Ok(parse_tax_rate(&raw)?),
        None => Ok(TaxRate::zero()),
    }
}

pub async fn code_prefix<'e, E>(executor: E) -> DbResult<String>
where
    E: Executor<'e, Database = Sqlite>,
{
    match get_value(executor, TRANSACTION_CODE_PREFIX).await? {
        Some(prefix) => {
            validate_prefix(&prefix)?;
            Ok(prefix)
        }
        None => Ok(DEFAULT_CODE_PREFIX.to_string()),
    }
}

fn parse_tax_rate(raw: &str) -> Result<TaxRate, ValidationError> {
    let bps: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidFormat {
            field: TAX_RATE_BPS.to_string(),
            reason: "must be an integer number of basis points".to_string(),
        })?;
    validate_tax_rate_bps(bps)?;
    Ok(TaxRate::from_bps(bps as u32))
}

// =============================================================================
// Unit Tests
// =============================================================================
