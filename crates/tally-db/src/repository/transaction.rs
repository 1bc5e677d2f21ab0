//! # Transaction Repository
//!
//! Storage for transactions and their line items.
//!
//! ## Read Side vs Write Side
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TransactionRepository (pool)          free fns (&mut SqliteConnection) │
//! │  ───────────────────────────           ──────────────────────────────── │
//! │  get / get_by_code / items             insert / insert_item            │
//! │  list(filter) / count(filter)          count_created_between           │
//! │                                        transition_status               │
//! │  Reporting and RPC reads.              fetch / fetch_items             │
//! │                                                                         │
//! │                                        Only called by the engine, on   │
//! │                                        the connection of an open unit  │
//! │                                        of work.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Items are never updated or deleted individually; they go away only if
//! their transaction row is deleted (cascade).

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{Transaction, TransactionFilter, TransactionItem, TransactionStatus};

const TRANSACTION_COLUMNS: &str = r#"
    id, code, user_id,
    subtotal, discount_amount, tax_amount, total_amount,
    payment_method, status, notes,
    created_at, updated_at
"#;

const ITEM_COLUMNS: &str = r#"
    id, transaction_id, product_id, product_name,
    quantity, unit_price, discount, line_total, created_at
"#;

/// Read-side repository for transactions.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Gets a transaction by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Transaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?");
        let txn = sqlx::query_as::<_, Transaction>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(txn)
    }

    /// Gets a transaction by its business code (`TRX-20261016-001`).
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Transaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE code = ?");
        let txn = sqlx::query_as::<_, Transaction>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(txn)
    }

    /// Gets the line items of a transaction in the order they were sold.
    pub async fn items(&self, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM transaction_items WHERE transaction_id = ? ORDER BY rowid"
        );
        let items = sqlx::query_as::<_, TransactionItem>(&sql)
            .bind(transaction_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Lists transactions matching `filter`, newest first.
    ///
    /// Ties on `created_at` are broken by code, descending, so pages are stable.
    /// Without a `limit` every matching row is returned.
    pub async fn list(&self, filter: &TransactionFilter) -> DbResult<Vec<Transaction>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE 1 = 1"));
        push_filter(&mut qb, filter);

        qb.push(" ORDER BY created_at DESC, code DESC LIMIT ")
            // SQLite: a negative LIMIT means no limit
            .push_bind(filter.effective_limit().unwrap_or(-1))
            .push(" OFFSET ")
            .push_bind(filter.effective_offset());

        let txns = qb
            .build_query_as::<Transaction>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = txns.len(), "Listed transactions");
        Ok(txns)
    }

    /// Counts transactions matching `filter`, ignoring pagination.
    pub async fn count(&self, filter: &TransactionFilter) -> DbResult<i64> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM transactions WHERE 1 = 1");
        push_filter(&mut qb, filter);

        let total = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

fn push_filter<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a TransactionFilter) {
    if let Some(from) = filter.from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
    if let Some(user_id) = &filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id.as_str());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
}

// =============================================================================
// Write side (unit-of-work connection)
// =============================================================================

/// Inserts a transaction row.
///
/// A duplicate code surfaces as `DbError::UniqueViolation` on
/// `transactions.code`; the surrounding SQLite transaction stays usable.
pub async fn insert(conn: &mut SqliteConnection, txn: &Transaction) -> DbResult<()> {
    debug!(id = %txn.id, code = %txn.code, "Inserting transaction");

    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, code, user_id,
            subtotal, discount_amount, tax_amount, total_amount,
            payment_method, status, notes,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&txn.id)
    .bind(&txn.code)
    .bind(&txn.user_id)
    .bind(txn.subtotal)
    .bind(txn.discount_amount)
    .bind(txn.tax_amount)
    .bind(txn.total_amount)
    .bind(txn.payment_method)
    .bind(txn.status)
    .bind(&txn.notes)
    .bind(txn.created_at)
    .bind(txn.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts one line item.
pub async fn insert_item(conn: &mut SqliteConnection, item: &TransactionItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transaction_items (
            id, transaction_id, product_id, product_name,
            quantity, unit_price, discount, line_total, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&item.id)
    .bind(&item.transaction_id)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.discount)
    .bind(item.line_total)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Counts transactions created in `[start, end)`.
pub async fn count_created_between(
    conn: &mut SqliteConnection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM transactions WHERE created_at >= ? AND created_at < ?",
    )
    .bind(start)
    .bind(end)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

/// Moves a `completed` transaction to `to`.
///
/// Returns `false` when no row changed: the transaction is missing or no
/// longer `completed`. The caller tells the two apart with [`fetch`].
pub async fn transition_status(
    conn: &mut SqliteConnection,
    id: &str,
    to: TransactionStatus,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE transactions SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(to)
    .bind(now)
    .bind(id)
    .bind(TransactionStatus::Completed)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Reads a transaction on the unit-of-work connection.
pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Transaction>> {
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?");
    let txn = sqlx::query_as::<_, Transaction>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(txn)
}

/// Reads the items of a transaction on the unit-of-work connection.
pub async fn fetch_items(
    conn: &mut SqliteConnection,
    transaction_id: &str,
) -> DbResult<Vec<TransactionItem>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM transaction_items WHERE transaction_id = ? ORDER BY rowid"
    );
    let items = sqlx::query_as::<_, TransactionItem>(&sql)
        .bind(transaction_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(items)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use tally_core::{Money, PaymentMethod, UserRole};
    use uuid::Uuid;

    fn sample(user_id: &str, code: &str, at: DateTime<Utc>) -> Transaction {
        Transaction {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            user_id: user_id.to_string(),
            subtotal: Money::from_cents(1000),
            discount_amount: Money::zero(),
            tax_amount: Money::zero(),
            total_amount: Money::from_cents(1000),
            payment_method: PaymentMethod::Cash,
            status: TransactionStatus::Completed,
            notes: None,
            created_at: at,
            updated_at: at,
        }
    }

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db
            .users()
            .insert("kasir1", "Kasir Satu", UserRole::Cashier)
            .await
            .unwrap();
        (db, user.id)
    }

    #[tokio::test]
    async fn test_insert_fetch_and_duplicate_code() {
        let (db, user_id) = setup().await;
        let now = Utc::now();
        let txn = sample(&user_id, "TRX-20261016-001", now);

        let mut tx = db.pool().begin().await.unwrap();
        insert(&mut tx, &txn).await.unwrap();

        let dup = sample(&user_id, "TRX-20261016-001", now);
        let err = insert(&mut tx, &dup).await.unwrap_err();
        assert!(err.is_unique_violation_on("transactions.code"));

        // the first insert survives the failed statement
        assert!(fetch(&mut tx, &txn.id).await.unwrap().is_some());
        tx.commit().await.unwrap();

        let by_code = db
            .transactions()
            .get_by_code("TRX-20261016-001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_code.id, txn.id);
        assert_eq!(by_code.total_amount, Money::from_cents(1000));
    }

    #[tokio::test]
    async fn test_transition_only_from_completed() {
        let (db, user_id) = setup().await;
        let txn = sample(&user_id, "TRX-20261016-001", Utc::now());

        let mut conn = db.pool().acquire().await.unwrap();
        insert(&mut conn, &txn).await.unwrap();

        let now = Utc::now();
        assert!(transition_status(&mut conn, &txn.id, TransactionStatus::Cancelled, now)
            .await
            .unwrap());
        assert!(!transition_status(&mut conn, &txn.id, TransactionStatus::Refunded, now)
            .await
            .unwrap());
        assert!(!transition_status(&mut conn, "missing", TransactionStatus::Cancelled, now)
            .await
            .unwrap());

        let stored = fetch(&mut conn, &txn.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_count_created_between_day_bounds() {
        let (db, user_id) = setup().await;
        let (start, end) = tally_core::code::day_bounds(Utc::now());

        let mut conn = db.pool().acquire().await.unwrap();
        insert(&mut conn, &sample(&user_id, "A-1", start)).await.unwrap();
        insert(&mut conn, &sample(&user_id, "A-2", start + Duration::hours(12)))
            .await
            .unwrap();
        insert(&mut conn, &sample(&user_id, "A-3", end)).await.unwrap();
        insert(&mut conn, &sample(&user_id, "A-4", start - Duration::seconds(1)))
            .await
            .unwrap();

        assert_eq!(count_created_between(&mut conn, start, end).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_filters_and_order() {
        let (db, user_id) = setup().await;
        let base = Utc::now() - Duration::days(3);

        {
            let mut conn = db.pool().acquire().await.unwrap();
            for i in 0..4 {
                let txn = sample(&user_id, &format!("TRX-{i}"), base + Duration::days(i));
                insert(&mut conn, &txn).await.unwrap();
            }
        }

        let repo = db.transactions();
        let all = repo.list(&TransactionFilter::default()).await.unwrap();
        let codes: Vec<_> = all.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(codes, ["TRX-3", "TRX-2", "TRX-1", "TRX-0"]);

        let window = TransactionFilter {
            from: Some(base + Duration::days(1)),
            to: Some(base + Duration::days(2)),
            ..Default::default()
        };
        assert_eq!(repo.count(&window).await.unwrap(), 2);

        let page = TransactionFilter {
            offset: Some(1),
            limit: Some(2),
            ..Default::default()
        };
        let listed = repo.list(&page).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].code, "TRX-2");
        assert_eq!(repo.count(&page).await.unwrap(), 4);

        let nobody = TransactionFilter {
            user_id: Some(Uuid::new_v4().to_string()),
            ..Default::default()
        };
        assert!(repo.list(&nobody).await.unwrap().is_empty());

        let cancelled = TransactionFilter {
            status: Some(TransactionStatus::Cancelled),
            ..Default::default()
        };
        assert_eq!(repo.count(&cancelled).await.unwrap(), 0);
    }
}
