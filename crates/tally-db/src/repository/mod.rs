//! # Repository Module
//!
//! Database repository implementations for Tally POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  RPC handler / engine                                                  │
//! │       │                                                                 │
//! │       │  db.products().list_low_stock()                                │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── get(&self, id)                                                    │
//! │  ├── insert(&self, new_product)                                        │
//! │  └── list_low_stock(&self)                                             │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories hold a pool and run each call on its own connection.
//! Statements that must join a unit of work are free functions taking
//! `&mut SqliteConnection` so the engine can pass its open transaction.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product catalog
//! - [`category::CategoryRepository`] - Categories (delete blocked while in use)
//! - [`user::UserRepository`] - Users recording transactions
//! - [`settings::SettingsRepository`] - Tax rate, code prefix
//! - [`transaction::TransactionRepository`] - Transaction read side

pub mod category;
pub mod product;
pub mod settings;
pub mod transaction;
pub mod user;
