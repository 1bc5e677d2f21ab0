//! # Transaction Engine
//!
//! Creates, cancels and refunds transactions. Each operation is one atomic
//! unit of work: everything it changes commits together or not at all.
//!
//! ## Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate request ──► user active? ──► BEGIN                           │
//! │                                          │                              │
//! │                 for each line:  ledger::reserve_and_decrement (CAS)    │
//! │                                          │                              │
//! │                 settings: tax rate, code prefix                        │
//! │                                          │                              │
//! │                 pricing::calculate_totals                              │
//! │                                          │                              │
//! │                 mint code ◄──── UNIQUE(code) hit? next sequence        │
//! │                                          │                              │
//! │                 insert transaction + items ──► COMMIT                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cancel / Refund
//! ```text
//!   BEGIN ─► status CAS completed → cancelled|refunded
//!              │ 0 rows: NotFound or InvalidTransactionStatus
//!              ▼
//!            ledger::increment for every item ─► COMMIT
//! ```
//!
//! ## Retries and Deadline
//! Every unit opens with a write, so SQLite hands out its single write lock
//! before anything is read. A unit that still loses a race fails with
//! [`DbError::Conflict`]; the engine then reruns it from the start with
//! exponential backoff, at most `max_conflict_retries` times. The whole
//! operation, retries included, is bounded by `deadline`.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::ledger::{self, LedgerError};
use crate::pool::Database;
use crate::repository::{settings, transaction};
use tally_core::code::day_bounds;
use tally_core::validation::{validate_create_transaction, validate_uuid};
use tally_core::{
    calculate_totals, CoreError, CreateTransaction, PricingLine, ReversalKind, StockSnapshot,
    Transaction, TransactionCode, TransactionFilter, TransactionItem, TransactionStatus,
    ValidationError,
};

// =============================================================================
// Configuration
// =============================================================================

/// Retry and deadline policy for units of work.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Reruns allowed after a write conflict.
    /// Default: 5
    pub max_conflict_retries: u32,

    /// Code sequences tried before giving up on a create.
    /// Default: 5
    pub max_code_attempts: u32,

    /// Bound on a whole operation, retries included.
    /// Default: 10 seconds
    pub deadline: Duration,

    /// First delay after a conflict.
    /// Default: 20 ms
    pub initial_backoff: Duration,

    /// Cap on the delay between reruns.
    /// Default: 500 ms
    pub max_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_conflict_retries: 5,
            max_code_attempts: 5,
            deadline: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(500),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Failure of an engine operation: either a domain outcome or storage.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] DbError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Database(DbError::from(err))
    }
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ProductNotFound(id) => CoreError::ProductNotFound(id).into(),
            LedgerError::ProductInactive(id) => CoreError::ProductInactive(id).into(),
            LedgerError::OutOfStock {
                product_id,
                name,
                available,
                requested,
            } => CoreError::InsufficientStock {
                product_id,
                product: name,
                available,
                requested,
            }
            .into(),
            LedgerError::StockOverflow { stock, .. } => {
                CoreError::Validation(ValidationError::OutOfRange {
                    field: "delta".to_string(),
                    min: i64::MIN,
                    max: i64::MAX - stock,
                })
                .into()
            }
            LedgerError::Database(e) => EngineError::Database(e),
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Entry point for every write to transactions and stock.
///
/// Cheap to clone; clones share the database pool.
#[derive(Debug, Clone)]
pub struct TransactionEngine {
    db: Database,
    config: EngineConfig,
}

impl TransactionEngine {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        TransactionEngine { db, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Records a sale and takes its stock.
    ///
    /// ## Returns
    /// * `Err(CoreError::Validation)` - malformed request, nothing touched
    /// * `Err(CoreError::UserNotFound)` - unknown or inactive user
    /// * `Err(CoreError::ProductNotFound | ProductInactive | InsufficientStock)`
    ///   - first failing line; no stock changed
    /// * `Err(CoreError::CodeGenerationExhausted)` - every code collided
    pub async fn create(&self, req: &CreateTransaction) -> EngineResult<Transaction> {
        validate_create_transaction(req)?;

        if !self.db.users().exists_active(&req.user_id).await? {
            return Err(CoreError::UserNotFound(req.user_id.clone()).into());
        }

        self.with_retry("create", move || self.try_create(req)).await
    }

    /// Voids a completed transaction and restores its stock.
    pub async fn cancel(&self, transaction_id: &str) -> EngineResult<Transaction> {
        self.with_retry("cancel", move || {
            self.try_reverse(transaction_id, ReversalKind::Cancel)
        })
        .await
    }

    /// Returns a completed transaction and restores its stock.
    ///
    /// Stock handling is identical to [`cancel`](Self::cancel); only the
    /// terminal status differs. No payment is reversed here.
    pub async fn refund(&self, transaction_id: &str) -> EngineResult<Transaction> {
        self.with_retry("refund", move || {
            self.try_reverse(transaction_id, ReversalKind::Refund)
        })
        .await
    }

    /// Manually restocks or corrects a product. Clamps at zero.
    ///
    /// Returns the new stock level.
    pub async fn adjust_stock(&self, product_id: &str, delta: i64) -> EngineResult<i64> {
        validate_uuid("product_id", product_id)?;
        self.with_retry("adjust_stock", move || self.try_adjust(product_id, delta))
            .await
    }

    /// Transactions matching `filter`, newest first.
    pub async fn list(&self, filter: &TransactionFilter) -> EngineResult<Vec<Transaction>> {
        Ok(self.db.transactions().list(filter).await?)
    }

    /// Number of transactions matching `filter`, ignoring pagination.
    pub async fn count(&self, filter: &TransactionFilter) -> EngineResult<i64> {
        Ok(self.db.transactions().count(filter).await?)
    }

    pub async fn get(&self, transaction_id: &str) -> EngineResult<Transaction> {
        self.db
            .transactions()
            .get(transaction_id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()).into())
    }

    /// Line items of a transaction, in sale order.
    pub async fn items(&self, transaction_id: &str) -> EngineResult<Vec<TransactionItem>> {
        let repo = self.db.transactions();
        if repo.get(transaction_id).await?.is_none() {
            return Err(CoreError::TransactionNotFound(transaction_id.to_string()).into());
        }
        Ok(repo.items(transaction_id).await?)
    }

    // =========================================================================
    // Units of work
    // =========================================================================

    async fn try_create(&self, req: &CreateTransaction) -> EngineResult<Transaction> {
        let mut tx = self.db.pool().begin().await?;

        // stock first: the first statement of the unit is a write
        let mut snapshots: Vec<StockSnapshot> = Vec::with_capacity(req.lines.len());
        for line in &req.lines {
            let snapshot =
                ledger::reserve_and_decrement(&mut tx, &line.product_id, line.quantity).await?;
            snapshots.push(snapshot);
        }

        let tax_rate = settings::tax_rate(&mut *tx).await?;
        let prefix = settings::code_prefix(&mut *tx).await?;

        let pricing: Vec<PricingLine> = snapshots
            .iter()
            .zip(&req.lines)
            .map(|(snap, line)| PricingLine::new(snap.selling_price, line.quantity, line.discount))
            .collect();
        let totals = calculate_totals(&pricing, req.transaction_discount, tax_rate)?;

        let now = Utc::now();
        let (day_start, day_end) = day_bounds(now);
        let id = Uuid::new_v4().to_string();
        let notes = req
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let mut attempt = 0u32;
        let txn = loop {
            if attempt >= self.config.max_code_attempts {
                return Err(CoreError::CodeGenerationExhausted { attempts: attempt }.into());
            }

            let existing = transaction::count_created_between(&mut tx, day_start, day_end).await?;
            let sequence = u32::try_from(existing)
                .unwrap_or(u32::MAX)
                .saturating_add(1 + attempt);
            let code = TransactionCode::new(&prefix, now.date_naive(), sequence)?;

            let candidate = Transaction {
                id: id.clone(),
                code: code.to_string(),
                user_id: req.user_id.clone(),
                subtotal: totals.subtotal,
                discount_amount: totals.discount_amount,
                tax_amount: totals.tax_amount,
                total_amount: totals.total_amount,
                payment_method: req.payment_method,
                status: TransactionStatus::Completed,
                notes: notes.clone(),
                created_at: now,
                updated_at: now,
            };

            match transaction::insert(&mut tx, &candidate).await {
                Ok(()) => break candidate,
                Err(e) if e.is_unique_violation_on("transactions.code") => {
                    warn!(code = %candidate.code, attempt, "Transaction code taken, trying next sequence");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        for ((snap, line), priced) in snapshots.iter().zip(&req.lines).zip(&totals.lines) {
            let item = TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: txn.id.clone(),
                product_id: snap.product_id.clone(),
                product_name: snap.name.clone(),
                quantity: line.quantity,
                unit_price: priced.unit_price,
                discount: priced.discount,
                line_total: priced.line_total,
                created_at: now,
            };
            transaction::insert_item(&mut tx, &item).await?;
        }

        tx.commit().await?;

        for (snap, line) in snapshots.iter().zip(&req.lines) {
            if snap.is_low_after(line.quantity) {
                warn!(
                    product_id = %snap.product_id,
                    product = %snap.name,
                    stock = snap.stock_after(line.quantity),
                    threshold = snap.low_stock_threshold,
                    "Product is low on stock"
                );
            }
        }

        info!(
            code = %txn.code,
            user_id = %txn.user_id,
            total = %txn.total_amount,
            items = req.lines.len(),
            "Transaction created"
        );

        Ok(txn)
    }

    async fn try_reverse(&self, transaction_id: &str, kind: ReversalKind) -> EngineResult<Transaction> {
        let mut tx = self.db.pool().begin().await?;
        let now = Utc::now();

        let moved =
            transaction::transition_status(&mut tx, transaction_id, kind.target_status(), now)
                .await?;

        if !moved {
            // dropping tx rolls back
            return match transaction::fetch(&mut tx, transaction_id).await? {
                None => Err(CoreError::TransactionNotFound(transaction_id.to_string()).into()),
                Some(current) => Err(CoreError::InvalidTransactionStatus {
                    transaction_id: transaction_id.to_string(),
                    status: current.status,
                    operation: kind,
                }
                .into()),
            };
        }

        let items = transaction::fetch_items(&mut tx, transaction_id).await?;
        for item in &items {
            ledger::increment(&mut tx, &item.product_id, item.quantity).await?;
        }

        let txn = transaction::fetch(&mut tx, transaction_id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;

        tx.commit().await?;

        info!(
            code = %txn.code,
            status = %txn.status,
            items = items.len(),
            "Transaction reversed, stock restored"
        );

        Ok(txn)
    }

    async fn try_adjust(&self, product_id: &str, delta: i64) -> EngineResult<i64> {
        let mut tx = self.db.pool().begin().await?;
        let stock = ledger::adjust(&mut tx, product_id, delta).await?;
        tx.commit().await?;

        info!(product_id = %product_id, delta, stock, "Stock adjusted");
        Ok(stock)
    }

    // =========================================================================
    // Retry policy
    // =========================================================================

    /// Runs `op` until it stops failing with a write conflict, within the
    /// configured deadline.
    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut op: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let max_retries = self.config.max_conflict_retries;

        let attempts = async {
            let mut backoff = self.create_backoff();
            let mut attempt = 0u32;

            loop {
                attempt += 1;
                match op().await {
                    Err(EngineError::Database(e)) if e.is_conflict() => {
                        if attempt > max_retries {
                            error!(operation, attempts = attempt, error = %e, "Giving up after repeated write conflicts");
                            return Err(CoreError::ConflictRetryExhausted {
                                operation,
                                attempts: attempt,
                            }
                            .into());
                        }
                        let wait = backoff.next_backoff().unwrap_or(self.config.max_backoff);
                        warn!(operation, attempt, ?wait, error = %e, "Write conflict, retrying");
                        tokio::time::sleep(wait).await;
                    }
                    Err(EngineError::Database(e)) => {
                        error!(operation, error = %e, "Unit of work failed");
                        return Err(e.into());
                    }
                    other => return other,
                }
            }
        };

        match tokio::time::timeout(self.config.deadline, attempts).await {
            Ok(result) => result,
            Err(_) => {
                let millis = u64::try_from(self.config.deadline.as_millis()).unwrap_or(u64::MAX);
                warn!(operation, millis, "Deadline exceeded, unit of work abandoned");
                Err(CoreError::DeadlineExceeded { operation, millis }.into())
            }
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.initial_backoff,
            max_interval: self.config.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None, // the deadline bounds total time
            ..Default::default()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
