//! # Inventory Ledger
//!
//! The only code that writes `products.stock_quantity`.
//!
//! ## Compare-and-Swap Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE products                                                        │
//! │     SET stock_quantity = stock_quantity - :qty                          │
//! │   WHERE id = :id AND is_active = 1 AND stock_quantity >= :qty           │
//! │  RETURNING ...                                                          │
//! │                                                                         │
//! │  1 row  → reserved; snapshot.stock_before = returned + qty             │
//! │  0 rows → look the product up once to say why:                         │
//! │           missing → ProductNotFound                                    │
//! │           inactive → ProductInactive                                   │
//! │           otherwise → OutOfStock { available, requested }              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The check and the write are one statement, so no concurrent sale can slip
//! between them. Every function takes the connection of an already open unit
//! of work; the caller commits or rolls back.

use chrono::Utc;
use sqlx::SqliteConnection;
use thiserror::Error;
use tracing::debug;

use crate::error::DbError;
use tally_core::{Money, StockSnapshot};

/// Why a stock operation did not go through.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Product {0} is inactive")]
    ProductInactive(String),

    #[error("Out of stock for {name}: available {available}, requested {requested}")]
    OutOfStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    #[error("Adjusting {product_id} by {delta} would overflow stock {stock}")]
    StockOverflow {
        product_id: String,
        stock: i64,
        delta: i64,
    },

    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Database(DbError::from(err))
    }
}

#[derive(sqlx::FromRow)]
struct ReservedRow {
    id: String,
    name: String,
    selling_price: Money,
    stock_quantity: i64,
    low_stock_threshold: i64,
}

#[derive(sqlx::FromRow)]
struct StockRow {
    name: String,
    is_active: bool,
    stock_quantity: i64,
}

/// Takes `quantity` units of a product, or fails without touching it.
///
/// Returns the product as it was immediately before the decrement.
pub async fn reserve_and_decrement(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> Result<StockSnapshot, LedgerError> {
    let reserved = sqlx::query_as::<_, ReservedRow>(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity - ?, updated_at = ?
        WHERE id = ? AND is_active = 1 AND stock_quantity >= ?
        RETURNING id, name, selling_price, stock_quantity, low_stock_threshold
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(row) = reserved {
        debug!(
            product_id = %row.id,
            quantity,
            remaining = row.stock_quantity,
            "Stock reserved"
        );
        return Ok(StockSnapshot {
            product_id: row.id,
            name: row.name,
            selling_price: row.selling_price,
            stock_before: row.stock_quantity + quantity,
            low_stock_threshold: row.low_stock_threshold,
        });
    }

    let current = sqlx::query_as::<_, StockRow>(
        "SELECT name, is_active, stock_quantity FROM products WHERE id = ?",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    match current {
        None => Err(LedgerError::ProductNotFound(product_id.to_string())),
        Some(row) if !row.is_active => Err(LedgerError::ProductInactive(product_id.to_string())),
        Some(row) => Err(LedgerError::OutOfStock {
            product_id: product_id.to_string(),
            name: row.name,
            available: row.stock_quantity,
            requested: quantity,
        }),
    }
}

/// Puts `quantity` units back. Used by cancel and refund.
///
/// Deactivated products still take their stock back.
pub async fn increment(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> Result<i64, LedgerError> {
    let stock: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + ?, updated_at = ?
        WHERE id = ?
        RETURNING stock_quantity
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    let stock = stock.ok_or_else(|| LedgerError::ProductNotFound(product_id.to_string()))?;
    debug!(product_id = %product_id, quantity, stock, "Stock restored");
    Ok(stock)
}

/// Manual restock or correction. Never goes below zero.
///
/// A delta that would push the count past `i64::MAX` leaves the row alone
/// and fails with `StockOverflow`. SQLite would otherwise turn the sum into
/// a REAL.
pub async fn adjust(
    conn: &mut SqliteConnection,
    product_id: &str,
    delta: i64,
) -> Result<i64, LedgerError> {
    let stock: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock_quantity = MAX(0, stock_quantity + ?), updated_at = ?
        WHERE id = ? AND (? <= 0 OR stock_quantity <= 9223372036854775807 - ?)
        RETURNING stock_quantity
        "#,
    )
    .bind(delta)
    .bind(Utc::now())
    .bind(product_id)
    .bind(delta)
    .bind(delta)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(stock) = stock {
        debug!(product_id = %product_id, delta, stock, "Stock adjusted");
        return Ok(stock);
    }

    let current: Option<i64> =
        sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    match current {
        None => Err(LedgerError::ProductNotFound(product_id.to_string())),
        Some(stock) => Err(LedgerError::StockOverflow {
            product_id: product_id.to_string(),
            stock,
            delta,
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, NewProduct};

    async fn setup(stock: i64) -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&NewProduct {
                low_stock_threshold: 2,
                ..NewProduct::new("Kopi Susu", Money::from_cents(1999), stock)
            })
            .await
            .unwrap();
        (db, product.id)
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().get(id).await.unwrap().unwrap().stock_quantity
    }

    #[tokio::test]
    async fn test_reserve_returns_snapshot_before_decrement() {
        let (db, id) = setup(10).await;
        let mut conn = db.pool().acquire().await.unwrap();

        let snap = reserve_and_decrement(&mut conn, &id, 4).await.unwrap();
        assert_eq!(snap.stock_before, 10);
        assert_eq!(snap.stock_after(4), 6);
        assert_eq!(snap.selling_price, Money::from_cents(1999));
        assert_eq!(snap.name, "Kopi Susu");
        drop(conn);

        assert_eq!(stock_of(&db, &id).await, 6);
    }

    #[tokio::test]
    async fn test_reserve_out_of_stock_leaves_stock() {
        let (db, id) = setup(3).await;
        let mut conn = db.pool().acquire().await.unwrap();

        let err = reserve_and_decrement(&mut conn, &id, 5).await.unwrap_err();
        match err {
            LedgerError::OutOfStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("expected OutOfStock, got {other:?}"),
        }

        // exactly the remaining stock is fine
        reserve_and_decrement(&mut conn, &id, 3).await.unwrap();
        drop(conn);
        assert_eq!(stock_of(&db, &id).await, 0);
    }

    #[tokio::test]
    async fn test_reserve_missing_and_inactive() {
        let (db, id) = setup(5).await;
        db.products().set_active(&id, false).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(matches!(
            reserve_and_decrement(&mut conn, "no-such-product", 1).await,
            Err(LedgerError::ProductNotFound(_))
        ));
        assert!(matches!(
            reserve_and_decrement(&mut conn, &id, 1).await,
            Err(LedgerError::ProductInactive(_))
        ));
        drop(conn);
        assert_eq!(stock_of(&db, &id).await, 5);
    }

    #[tokio::test]
    async fn test_increment_and_adjust() {
        let (db, id) = setup(2).await;
        let mut conn = db.pool().acquire().await.unwrap();

        assert_eq!(increment(&mut conn, &id, 3).await.unwrap(), 5);
        assert_eq!(adjust(&mut conn, &id, 10).await.unwrap(), 15);
        assert_eq!(adjust(&mut conn, &id, -100).await.unwrap(), 0);
        assert!(matches!(
            increment(&mut conn, "gone", 1).await,
            Err(LedgerError::ProductNotFound(_))
        ));
        assert!(matches!(
            adjust(&mut conn, "gone", 1).await,
            Err(LedgerError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_adjust_rejects_overflowing_delta() {
        let (db, id) = setup(5).await;
        let mut conn = db.pool().acquire().await.unwrap();

        match adjust(&mut conn, &id, i64::MAX).await.unwrap_err() {
            LedgerError::StockOverflow { stock, delta, .. } => {
                assert_eq!(stock, 5);
                assert_eq!(delta, i64::MAX);
            }
            other => panic!("expected StockOverflow, got {other:?}"),
        }

        // the largest delta that still fits
        assert_eq!(adjust(&mut conn, &id, i64::MAX - 5).await.unwrap(), i64::MAX);
        assert_eq!(adjust(&mut conn, &id, i64::MIN).await.unwrap(), 0);
        drop(conn);
        assert_eq!(stock_of(&db, &id).await, 0);
    }
}
