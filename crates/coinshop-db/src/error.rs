//! # Database Error Types
//!
//! Error types for ledger store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← categorized, tagged with the failing step     │
//! │       │                   e.g. Step("credit recipient", QueryFailed)   │
//! │       ▼                                                                 │
//! │  LedgerError (facade)  ← NotFound → UserNotFound / ItemNotFound        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (HTTP)       ← status code + {"error": ...}                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Business vs Storage Errors
//! `NotFound`, `InsufficientBalance` and `SelfTransfer` are outcomes the
//! ledger decides on purpose. They pass through [`StepContext::step`]
//! untouched. Everything else is a storage failure and gets wrapped in
//! [`DbError::Step`] so logs show which statement broke.

use std::fmt;
use std::time::Duration;

use coinshop_core::{Coins, UserId};
use thiserror::Error;

// =============================================================================
// Entity
// =============================================================================

/// Kind of row a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Item,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::User => write!(f, "user"),
            Entity::Item => write!(f, "item"),
        }
    }
}

// =============================================================================
// DbError
// =============================================================================

/// Ledger store errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - Transfer recipient username has no row
    /// - A debit or credit matched no user id
    /// - Item name is not in the catalog
    #[error("{entity} not found: {key}")]
    NotFound { entity: Entity, key: String },

    /// The guarded debit refused to drive a balance below zero.
    #[error("insufficient balance for user {user_id}: {requested} requested")]
    InsufficientBalance { user_id: UserId, requested: Coins },

    /// Sender and recipient are the same account.
    #[error("sender and recipient are the same user")]
    SelfTransfer,

    /// Unique constraint violation.
    #[error("Duplicate value for {field}")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative balance, zero amount...).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Pool already closed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (no connection freed up within `acquire_timeout`).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// The operation did not finish within `operation_timeout`.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// A storage failure, tagged with the unit-of-work step that raised it.
    #[error("{step}: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<DbError>,
    },

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity kind and key.
    pub fn not_found(entity: Entity, key: impl Into<String>) -> Self {
        DbError::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// True for outcomes the ledger produces on purpose.
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            DbError::NotFound { .. } | DbError::InsufficientBalance { .. } | DbError::SelfTransfer
        )
    }

    /// Strips any step tags and returns the underlying error.
    pub fn root(&self) -> &DbError {
        match self {
            DbError::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// Wraps a storage error with the step that raised it.
    ///
    /// Business errors come back unchanged.
    pub fn at(self, step: &'static str) -> Self {
        if self.is_business() {
            self
        } else {
            DbError::Step {
                step,
                source: Box::new(self),
            }
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
///
/// `RowNotFound` is not mapped to `NotFound`: repositories use
/// `fetch_optional` and name the missing entity themselves.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                // "CHECK constraint failed: <expr>"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Step Context
// =============================================================================

/// Attaches a step name to a failing result.
///
/// ```rust,ignore
/// sqlx::query("UPDATE users SET balance = balance + ? WHERE id = ?")
///     .execute(&mut **tx)
///     .await
///     .step("credit recipient")?;
/// ```
pub trait StepContext<T> {
    fn step(self, step: &'static str) -> DbResult<T>;
}

impl<T, E> StepContext<T> for Result<T, E>
where
    E: Into<DbError>,
{
    fn step(self, step: &'static str) -> DbResult<T> {
        self.map_err(|e| e.into().at(step))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
