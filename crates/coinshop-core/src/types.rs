//! # Domain Types
//!
//! Records shared by the ledger store and the facade.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   UserRecord    │   │  HistoryEntry   │   │ InventoryEntry  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UserId)    │   │  counterpart    │   │  item           │       │
//! │  │  username       │   │  amount (Coins) │   │  quantity ≥ 1   │       │
//! │  │  password_hash  │   │  created_at     │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Item       │   │   CoinHistory   │   │ AccountSummary  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  name (unique)  │   │  sent           │   │  balance        │       │
//! │  │  price (Coins)  │   │  received       │   │  inventory      │       │
//! │  └─────────────────┘   └─────────────────┘   │  history        │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::coins::Coins;

// =============================================================================
// User Identity
// =============================================================================

/// Stable numeric identity of a user.
///
/// Assigned by the store at registration and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct UserId(i64);

impl UserId {
    /// Wraps a raw id.
    #[inline]
    pub const fn new(id: i64) -> Self {
        UserId(id)
    }

    /// Returns the raw id.
    #[inline]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id)
    }
}

// =============================================================================
// User
// =============================================================================

/// The canonical credential record returned by the credential store.
///
/// `password_hash` is the **stored** hash, never the candidate supplied by
/// the caller. The facade compares the plaintext password against it.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
}

/// Debug output never includes the password hash.
impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A catalog item. Read-only from the ledger's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Item {
    /// Unique item name (e.g. "cup").
    pub name: String,

    /// Price of one unit.
    pub price: Coins,
}

// =============================================================================
// Inventory
// =============================================================================

/// One row of a user's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryEntry {
    /// Catalog item name.
    pub item: String,

    /// Units owned. Always at least 1; never decreases.
    pub quantity: i64,
}

// =============================================================================
// Coin History
// =============================================================================

/// One side of a recorded transfer, seen from the requesting user.
///
/// For a sent entry `counterpart` is the receiver; for a received entry it
/// is the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct HistoryEntry {
    /// Username of the other party. `None` when the join found no user row.
    pub counterpart: Option<String>,

    /// Amount moved.
    pub amount: Coins,

    /// When the transfer was recorded.
    pub created_at: DateTime<Utc>,
}

/// A user's transfer history, split by direction.
///
/// Each list is in the order the transfers were recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinHistory {
    pub sent: Vec<HistoryEntry>,
    pub received: Vec<HistoryEntry>,
}

impl CoinHistory {
    /// Total coins sent.
    pub fn total_sent(&self) -> Coins {
        self.sent.iter().map(|e| e.amount).sum()
    }

    /// Total coins received.
    pub fn total_received(&self) -> Coins {
        self.received.iter().map(|e| e.amount).sum()
    }
}

// =============================================================================
// Account Summary
// =============================================================================

/// Everything the facade reports about one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub balance: Coins,
    pub inventory: Vec<InventoryEntry>,
    pub history: CoinHistory,
}

impl AccountSummary {
    /// Quantity held of `item`, or 0.
    pub fn quantity_of(&self, item: &str) -> i64 {
        self.inventory
            .iter()
            .find(|entry| entry.item == item)
            .map(|entry| entry.quantity)
            .unwrap_or(0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
