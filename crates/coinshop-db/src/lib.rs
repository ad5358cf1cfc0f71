//! # coinshop-db: Ledger Store for Coinshop
//!
//! This crate provides durable, atomic access to the coin ledger.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Coinshop Data Flow                               │
//! │                                                                         │
//! │  Ledger facade (transfer, purchase, summary)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  coinshop-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ UserRepo      │    │ 001_schema   │  │   │
//! │  │   │ SqlitePool    │◄───│ LedgerRepo    │    │ 002_catalog  │  │   │
//! │  │   │ Deadlines     │    │ CatalogRepo   │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                                │   │
//! │  │                     unit_of_work (BEGIN / COMMIT / ROLLBACK)   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
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
//! - [`error`] - Database error types and step context
//! - [`unit_of_work`] - Transaction boundary for mutations
//! - [`repository`] - Credential store, ledger store, catalog
//!
//! ## Usage
//!
//! ```rust,ignore
//! use coinshop_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("coinshop.db")).await?;
//!
//! let alice = db.users().authenticate("alice", &hash).await?;
//! db.ledger().send_coin(alice.id, "bob", Coins::new(200)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, Entity};
pub use pool::{Database, DbConfig};

pub use repository::catalog::CatalogRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::user::UserRepository;
