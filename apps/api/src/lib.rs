//! # Tally API
//!
//! JSON RPC server in front of the transaction engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         RPC Surface                                     │
//! │                                                                         │
//! │  ┌──────────────────────────┐  ┌──────────────────────────┐            │
//! │  │  transactions.*          │  │  inventory.*             │            │
//! │  │                          │  │                          │            │
//! │  │ • create   (POST)        │  │ • adjust   (POST)        │            │
//! │  │ • cancel   (POST)        │  │ • lowStock (GET)         │            │
//! │  │ • refund   (POST)        │  └──────────────────────────┘            │
//! │  │ • get      (GET ?id=)    │                                          │
//! │  │ • items    (GET ?id=)    │  ┌──────────────────────────┐            │
//! │  │ • list     (GET filter)  │  │  /health                 │            │
//! │  └──────────────────────────┘  └──────────────────────────┘            │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  AppState: Database + TransactionEngine (cheap clones)           │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`]. Business settings (tax rate, code prefix) are read from
//! the database on every sale, not from process configuration.

pub mod config;
pub mod error;
pub mod rpc;

use std::sync::Arc;

use axum::Router;
use tally_db::{Database, EngineConfig, TransactionEngine};
use tower_http::trace::TraceLayer;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub engine: TransactionEngine,
}

impl AppState {
    pub fn new(db: Database, engine_config: EngineConfig) -> Self {
        let engine = db.engine(engine_config);
        AppState { db, engine }
    }
}

/// Builds the full HTTP router with request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    rpc::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
