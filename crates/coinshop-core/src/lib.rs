//! # coinshop-core: Pure Ledger Types for Coinshop
//!
//! This crate is the domain vocabulary of the coin ledger. It holds every
//! type the store and the facade agree on, with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Coinshop Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP routes (axum)                           │   │
//! │  │    /api/auth ──► /api/info ──► /api/sendCoin ──► /api/buy      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              Ledger Facade + Session Issuer                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ coinshop-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   coins   │  │   error   │  │ validation│  │   │
//! │  │   │  UserId   │  │   Coins   │  │LedgerError│  │   rules   │  │   │
//! │  │   │  History  │  │           │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                coinshop-db (Ledger Store)                       │   │
//! │  │          SQLite units of work, migrations, repositories         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (UserRecord, InventoryEntry, CoinHistory, ...)
//! - [`coins`] - Coin amounts
//! - [`error`] - Ledger error taxonomy
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use coinshop_core::{Coins, STARTING_BALANCE};
//!
//! let balance = STARTING_BALANCE;
//! let total: Coins = [balance, Coins::new(200)].into_iter().sum();
//! assert_eq!(total.amount(), 1200);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coins;
pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use coins::Coins;
pub use error::{LedgerError, LedgerResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Balance granted to every user on auto-registration.
///
/// This is the only way coins enter the ledger.
pub const STARTING_BALANCE: Coins = Coins::new(1000);

/// Maximum username length accepted at registration.
pub const MAX_USERNAME_LEN: usize = 64;

/// Maximum catalog item name length.
pub const MAX_ITEM_NAME_LEN: usize = 64;
