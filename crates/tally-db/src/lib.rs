//! # tally-db: Database Layer for Tally POS
//!
//! This crate provides database access for the Tally POS system and owns
//! every unit of work that changes stock or transactions.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Data Flow                              │
//! │                                                                         │
//! │  RPC handler (transactions.create)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ TransactionEng│───►│ Inventory     │    │  Migrations  │  │   │
//! │  │   │ (engine.rs)   │    │ Ledger        │    │  (embedded)  │  │   │
//! │  │   │ retry/deadline│    │ (ledger.rs)   │    │              │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │                    │                               │   │
//! │  │   ┌───────▼────────────────────▼───────┐                      │   │
//! │  │   │ Repositories (product, category,   │                      │   │
//! │  │   │ user, settings, transaction)       │                      │   │
//! │  │   └───────────────┬────────────────────┘                      │   │
//! │  │                   │  Database (pool.rs)                        │   │
//! │  └───────────────────┼─────────────────────────────────────────────┘   │
//! │                      ▼                                                  │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`ledger`] - Stock reservation, restoration and adjustment
//! - [`engine`] - Create / cancel / refund / list as atomic units of work
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig, EngineConfig};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//! let engine = db.engine(EngineConfig::default());
//!
//! let txn = engine.create(request).await?;
//! engine.cancel(&txn.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::{EngineConfig, EngineError, EngineResult, TransactionEngine};
pub use error::{DbError, DbResult};
pub use ledger::LedgerError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::settings::SettingsRepository;
pub use repository::transaction::TransactionRepository;
pub use repository::user::UserRepository;
