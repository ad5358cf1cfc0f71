//! # Error Types
//!
//! Domain-specific error types for coinshop-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  coinshop-core errors (this file)                                      │
//! │  ├── LedgerError      - What the facade reports                        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  coinshop-db errors (separate crate)                                   │
//! │  └── DbError          - Storage failures, tagged with the failing step │
//! │                                                                         │
//! │  coinshop-api errors                                                   │
//! │  └── ApiError         - HTTP status + JSON body                        │
//! │                                                                         │
//! │  Flow: sqlx::Error → DbError → LedgerError → ApiError → client         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Disclosure
//! `InvalidCredentials` and `InvalidToken` carry no detail. A caller learns
//! that authentication failed, never why.

use thiserror::Error;

use crate::coins::Coins;

// =============================================================================
// Ledger Error
// =============================================================================

/// Errors surfaced by the ledger facade.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Empty or mismatched password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Malformed, unsigned or identity-less bearer token.
    #[error("invalid token")]
    InvalidToken,

    /// A referenced user does not exist.
    ///
    /// ## When This Occurs
    /// - Transfer recipient username is unknown
    /// - The token's user id has no row (should not happen for issued tokens)
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// A referenced catalog item does not exist.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// The debit would drive the balance below zero.
    #[error("insufficient balance: {requested} required")]
    InsufficientBalance { requested: Coins },

    /// The request itself is malformed (non-positive amount, self transfer...).
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    /// Any storage failure not covered above.
    ///
    /// The message carries the failing step for logs. It is never shown to
    /// HTTP clients.
    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// True for errors a client caused and can fix (4xx territory).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, LedgerError::Storage(_))
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any store access.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., non-numeric amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Sender and recipient resolve to the same account.
    #[error("cannot transfer coins to yourself")]
    SelfTransfer,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with LedgerError.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Unit Tests
// =============================================================================
