//! `transactions.*` handlers.
//!
//! ## Request Flow (create)
//! ```text
//! POST /rpc/transactions.create  { user_id, lines[], payment_method, ... }
//!      │
//!      ▼
//! TransactionEngine::create ── validate ─► reserve stock ─► price ─► code
//!      │
//!      ├── Ok  ──► 200 Transaction
//!      └── Err ──► ApiError (status from ErrorCode)
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use tally_core::{CreateTransaction, Transaction, TransactionFilter, TransactionItem};
use tracing::debug;

use super::{Page, SharedState, TransactionRef};
use crate::error::ApiResult;

pub async fn create(
    State(state): State<SharedState>,
    payload: Result<Json<CreateTransaction>, JsonRejection>,
) -> ApiResult<Json<Transaction>> {
    let Json(req) = payload?;
    debug!(user_id = %req.user_id, lines = req.lines.len(), "transactions.create");

    let txn = state.engine.create(&req).await?;
    Ok(Json(txn))
}

pub async fn cancel(
    State(state): State<SharedState>,
    payload: Result<Json<TransactionRef>, JsonRejection>,
) -> ApiResult<Json<Transaction>> {
    let Json(target) = payload?;
    Ok(Json(state.engine.cancel(&target.id).await?))
}

pub async fn refund(
    State(state): State<SharedState>,
    payload: Result<Json<TransactionRef>, JsonRejection>,
) -> ApiResult<Json<Transaction>> {
    let Json(target) = payload?;
    Ok(Json(state.engine.refund(&target.id).await?))
}

pub async fn get(
    State(state): State<SharedState>,
    query: Result<Query<TransactionRef>, QueryRejection>,
) -> ApiResult<Json<Transaction>> {
    let Query(target) = query?;
    Ok(Json(state.engine.get(&target.id).await?))
}

pub async fn items(
    State(state): State<SharedState>,
    query: Result<Query<TransactionRef>, QueryRejection>,
) -> ApiResult<Json<Vec<TransactionItem>>> {
    let Query(target) = query?;
    Ok(Json(state.engine.items(&target.id).await?))
}

/// `GET /rpc/transactions.list?from=&to=&user_id=&status=&offset=&limit=`
///
/// Newest first. `from`/`to` are RFC 3339 and inclusive. Without `limit`
/// the page holds every matching row and `limit` echoes its size.
pub async fn list(
    State(state): State<SharedState>,
    query: Result<Query<TransactionFilter>, QueryRejection>,
) -> ApiResult<Json<Page<Transaction>>> {
    let Query(filter) = query?;

    let items = state.engine.list(&filter).await?;
    let total = state.engine.count(&filter).await?;
    let limit = filter
        .effective_limit()
        .unwrap_or(i64::try_from(items.len()).unwrap_or(i64::MAX));

    Ok(Json(Page {
        items,
        total,
        offset: filter.effective_offset(),
        limit,
    }))
}
