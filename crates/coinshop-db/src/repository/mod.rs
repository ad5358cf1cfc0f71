//! # Repository Module
//!
//! Database repository implementations for the coin ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories                                         │
//! │                                                                         │
//! │  Ledger facade                                                         │
//! │       │                                                                 │
//! │       │  db.ledger().send_coin(alice, "bob", 200)                      │
//! │       ▼                                                                 │
//! │  UserRepository         LedgerRepository        CatalogRepository      │
//! │  ├── authenticate       ├── get_balance         ├── get                │
//! │  ├── find_by_username   ├── get_inventory       ├── list               │
//! │  └── count              ├── get_coin_history    └── upsert             │
//! │                         ├── send_coin                                  │
//! │                         └── buy_item                                   │
//! │       │                                                                 │
//! │       │  SQL (one unit of work per mutation)                           │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`](user::UserRepository) - Credential store
//! - [`LedgerRepository`](ledger::LedgerRepository) - Balances, transfers, purchases
//! - [`CatalogRepository`](catalog::CatalogRepository) - Item prices

pub mod catalog;
pub mod ledger;
pub mod user;
