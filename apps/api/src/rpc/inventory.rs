//! `inventory.*` handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tally_core::Product;
use ts_rs::TS;

use super::SharedState;
use crate::error::ApiResult;

/// Manual stock correction. Negative deltas clamp at zero.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct AdjustStock {
    pub product_id: String,
    #[ts(type = "number")]
    pub delta: i64,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct StockLevel {
    pub product_id: String,
    #[ts(type = "number")]
    pub stock_quantity: i64,
}

pub async fn adjust(
    State(state): State<SharedState>,
    payload: Result<Json<AdjustStock>, JsonRejection>,
) -> ApiResult<Json<StockLevel>> {
    let Json(req) = payload?;
    let stock_quantity = state.engine.adjust_stock(&req.product_id, req.delta).await?;

    Ok(Json(StockLevel {
        product_id: req.product_id,
        stock_quantity,
    }))
}

/// Active products at or below their low-stock threshold.
pub async fn low_stock(State(state): State<SharedState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().list_low_stock().await?))
}
