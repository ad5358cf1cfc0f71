//! # Validation Module
//!
//! Input validation applied by the facade before any store access.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP route (axum)                                            │
//! │  └── JSON shape, numeric amount parsing                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Ledger facade                                                │
//! │  └── THIS MODULE: credentials, amounts, names                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (balance >= 0), CHECK (amount > 0)                          │
//! │  ├── UNIQUE (username), UNIQUE (user_id, item)                         │
//! │  └── Guarded debit: WHERE balance >= amount                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use coinshop_core::validation::{validate_transfer_amount, validate_username};
//! use coinshop_core::Coins;
//!
//! assert!(validate_username("alice").is_ok());
//! assert!(validate_transfer_amount(Coins::new(200)).is_ok());
//! assert!(validate_transfer_amount(Coins::new(0)).is_err());
//! ```

use crate::coins::Coins;
use crate::error::ValidationError;
use crate::{MAX_ITEM_NAME_LEN, MAX_USERNAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Credential Validators
// =============================================================================

/// Validates a username.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - At most [`MAX_USERNAME_LEN`] characters
pub fn validate_username(username: &str) -> ValidationResult<()> {
    validate_name("username", username, MAX_USERNAME_LEN)
}

/// Validates a plaintext password. Only emptiness is checked.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Ledger Validators
// =============================================================================

/// Validates a transfer amount.
///
/// ## Rules
/// - Must be strictly positive. A zero or negative transfer would either
///   record a meaningless row or move coins in the wrong direction.
///
/// ## Example
/// ```rust
/// use coinshop_core::validation::validate_transfer_amount;
/// use coinshop_core::Coins;
///
/// assert!(validate_transfer_amount(Coins::new(1)).is_ok());
/// assert!(validate_transfer_amount(Coins::new(-5)).is_err());
/// ```
pub fn validate_transfer_amount(amount: Coins) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Validates a catalog item name.
pub fn validate_item_name(item: &str) -> ValidationResult<()> {
    validate_name("item", item, MAX_ITEM_NAME_LEN)
}

/// Validates a catalog price (used by the seeding tool).
pub fn validate_price(price: Coins) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }
    Ok(())
}

/// Parses a transfer amount supplied as text (`"200"`).
pub fn parse_amount(raw: &str) -> ValidationResult<Coins> {
    raw.trim()
        .parse::<i64>()
        .map(Coins::new)
        .map_err(|e| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: e.to_string(),
        })
}

fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
