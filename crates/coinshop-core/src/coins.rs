//! # Coins Module
//!
//! Provides the `Coins` type for every balance, price and transfer amount.
//!
//! ## Why a Newtype?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CONSERVATION OF COINS                                                  │
//! │                                                                         │
//! │  Coins enter the ledger in exactly one place:                           │
//! │    registration  → +1000 (STARTING_BALANCE)                             │
//! │                                                                         │
//! │  Coins move, but never appear or vanish:                                │
//! │    transfer      → sender -N, receiver +N                               │
//! │    purchase      → buyer -price (leaves the ledger as inventory)        │
//! │                                                                         │
//! │  A bare i64 makes it easy to pass a user id where an amount belongs.    │
//! │  Coins keeps the two apart. Balance arithmetic itself runs in SQL.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use coinshop_core::coins::Coins;
//!
//! let price = Coins::new(50);
//! let balance = Coins::new(1000);
//!
//! assert!(price.is_positive());
//! assert_eq!(balance.amount() - price.amount(), 950);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

// =============================================================================
// Coins Type
// =============================================================================

/// An integral number of coins.
///
/// ## Design Decisions
/// - **i64 (signed)**: matches the SQLite INTEGER column; the store itself
///   refuses negative balances, so a negative value only ever shows up as
///   invalid user input (e.g. `amount: -5` in a transfer request)
/// - **Serialized transparently**: JSON sees a plain number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Coins(i64);

impl Coins {
    /// Creates a coin amount.
    #[inline]
    pub const fn new(amount: i64) -> Self {
        Coins(amount)
    }

    /// Returns zero coins.
    #[inline]
    pub const fn zero() -> Self {
        Coins(0)
    }

    /// Returns the raw amount.
    #[inline]
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Checks if the amount is strictly positive.
    ///
    /// Transfer amounts and item prices must be positive.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} coins", self.0)
    }
}

impl Default for Coins {
    fn default() -> Self {
        Coins::zero()
    }
}

impl From<i64> for Coins {
    fn from(amount: i64) -> Self {
        Coins(amount)
    }
}

impl From<Coins> for i64 {
    fn from(coins: Coins) -> Self {
        coins.0
    }
}

/// Addition used for totals in reports and tests.
impl Add for Coins {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Coins(self.0 + other.0)
    }
}

impl Sum for Coins {
    fn sum<I: Iterator<Item = Coins>>(iter: I) -> Self {
        iter.fold(Coins::zero(), |acc, c| acc + c)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Coins::new(1000).to_string(), "1000 coins");
        assert_eq!(Coins::zero().to_string(), "0 coins");
    }

    #[test]
    fn test_positive_checks() {
        assert!(Coins::new(1).is_positive());
        assert!(!Coins::zero().is_positive());
        assert!(!Coins::new(-3).is_positive());
    }

    #[test]
    fn test_sum_of_balances() {
        let total: Coins = [800, 1200, 1000].into_iter().map(Coins::new).sum();
        assert_eq!(total, Coins::new(3000));
    }

    #[test]
    fn test_serializes_as_plain_number() {
        let json = serde_json::to_string(&Coins::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: Coins = serde_json::from_str("42").unwrap();
        assert_eq!(back, Coins::new(42));
    }
}
