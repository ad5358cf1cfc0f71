//! # User Repository
//!
//! The credential store: one row per username, created on first sign-in.
//!
//! ## Authenticate Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  authenticate("alice", candidate_hash)                                  │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── INSERT ... ON CONFLICT (username) DO NOTHING                      │
//! │   │     new name   → row created, balance 1000                          │
//! │   │     known name → no-op (also when another caller won the race)      │
//! │   ├── SELECT id, username, password_hash WHERE username = ?             │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Returns the STORED hash. The facade verifies the password against it; │
//! │  for a brand new user that is the candidate hash itself.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult, Entity, StepContext};
use crate::unit_of_work::{self, with_deadline};
use coinshop_core::{UserRecord, STARTING_BALANCE};

/// Repository for user credential operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
    deadline: Option<Duration>,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool, deadline: Option<Duration>) -> Self {
        UserRepository { pool, deadline }
    }

    /// Registers `username` if it is new, then returns the canonical record.
    ///
    /// ## Arguments
    /// * `username` - Login name
    /// * `candidate_hash` - Hash of the presented password; stored only when
    ///   the user is created
    pub async fn authenticate(&self, username: &str, candidate_hash: &str) -> DbResult<UserRecord> {
        with_deadline(self.deadline, async {
            let mut tx = unit_of_work::begin(&self.pool).await?;
            let result = register_and_read(&mut tx, username, candidate_hash).await;
            unit_of_work::finish(tx, result).await
        })
        .await
    }

    /// Looks up a user by name without registering.
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<UserRecord>> {
        with_deadline(self.deadline, async {
            sqlx::query_as::<_, UserRecord>(
                "SELECT id, username, password_hash FROM users WHERE username = ?",
            )
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .step("read user")
        })
        .await
    }

    /// Counts registered users.
    pub async fn count(&self) -> DbResult<i64> {
        with_deadline(self.deadline, async {
            sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(&self.pool)
                .await
                .step("count users")
        })
        .await
    }
}

async fn register_and_read(
    conn: &mut SqliteConnection,
    username: &str,
    candidate_hash: &str,
) -> DbResult<UserRecord> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO users (username, password_hash, balance)
        VALUES (?, ?, ?)
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind(username)
    .bind(candidate_hash)
    .bind(STARTING_BALANCE)
    .execute(&mut *conn)
    .await
    .step("register user")?;

    let user = sqlx::query_as::<_, UserRecord>(
        "SELECT id, username, password_hash FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(&mut *conn)
    .await
    .step("read user")?
    .ok_or_else(|| DbError::not_found(Entity::User, username))?;

    if inserted.rows_affected() == 1 {
        info!(user_id = %user.id, username = %user.username, "Registered new user");
    } else {
        debug!(user_id = %user.id, "Existing user");
    }

    Ok(user)
}

// =============================================================================
// Unit Tests
// =============================================================================
