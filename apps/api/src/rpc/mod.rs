//! RPC route table and shared request/response shapes.

pub mod inventory;
pub mod transaction;

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ApiError;
use crate::AppState;

pub type SharedState = Arc<AppState>;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health))
        .route("/rpc/transactions.create", post(transaction::create))
        .route("/rpc/transactions.cancel", post(transaction::cancel))
        .route("/rpc/transactions.refund", post(transaction::refund))
        .route("/rpc/transactions.get", get(transaction::get))
        .route("/rpc/transactions.items", get(transaction::items))
        .route("/rpc/transactions.list", get(transaction::list))
        .route("/rpc/inventory.adjust", post(inventory::adjust))
        .route("/rpc/inventory.lowStock", get(inventory::low_stock))
}

// =============================================================================
// Shared Shapes
// =============================================================================

/// `{ "id": "..." }`, as a JSON body or a query string.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionRef {
    pub id: String,
}

/// One page of a listing plus the unpaged total.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[ts(type = "number")]
    pub total: i64,
    #[ts(type = "number")]
    pub offset: i64,
    #[ts(type = "number")]
    pub limit: i64,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct Health {
    pub status: String,
    pub database: bool,
}

// Malformed bodies and query strings get the same error shape as
// everything else instead of axum's plain-text rejections.

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

async fn health(State(state): State<SharedState>) -> (StatusCode, Json<Health>) {
    let database = state.db.health_check().await;
    let (status, label) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(Health {
            status: label.to_string(),
            database,
        }),
    )
}
