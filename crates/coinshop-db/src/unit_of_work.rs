//! # Unit of Work
//!
//! Transaction boundary shared by every mutating ledger operation.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Unit of Work                                      │
//! │                                                                         │
//! │  begin(pool) ──► BEGIN IMMEDIATE guard (one pooled connection,         │
//! │                  write lock held until commit/rollback)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  steps(&mut *tx) ──► DbResult<T>                                       │
//! │       │                                                                 │
//! │       ├── Ok(value) ──► COMMIT ──► value                               │
//! │       │                                                                 │
//! │       ├── Err(e)    ──► ROLLBACK ──► e   (rollback failure is logged,  │
//! │       │                                   never returned)              │
//! │       │                                                                 │
//! │       └── dropped (panic, timeout, caller went away)                   │
//! │                    ──► guard Drop rolls back, connection back to pool  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! with_deadline(self.deadline, async {
//!     let mut tx = unit_of_work::begin(&self.pool).await?;
//!     let result = transfer_steps(&mut tx, from, to, amount).await;
//!     unit_of_work::finish(tx, result).await
//! })
//! .await
//! ```

use std::future::Future;
use std::time::Duration;

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::error;

use crate::error::{DbError, DbResult, StepContext};

/// Opens a unit of work on a pooled connection.
///
/// Blocks until a connection is free or the pool's acquire timeout elapses.
/// The transaction starts `IMMEDIATE`: it takes the write lock before its
/// first read, so concurrent units of work wait on the busy timeout instead
/// of failing to upgrade a stale read snapshot.
pub async fn begin(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE").await.step("begin unit of work")
}

/// Commits on `Ok`, rolls back on `Err`.
///
/// The original error always wins over a rollback failure.
pub async fn finish<T>(tx: Transaction<'static, Sqlite>, result: DbResult<T>) -> DbResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await.step("commit unit of work")?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!(
                    error = %rollback_err,
                    original = %err,
                    "Rollback failed"
                );
            }
            Err(err)
        }
    }
}

/// Bounds `operation` by an optional deadline.
///
/// On expiry the operation future is dropped, which drops any transaction
/// guard it holds.
pub async fn with_deadline<T, F>(deadline: Option<Duration>, operation: F) -> DbResult<T>
where
    F: Future<Output = DbResult<T>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, operation)
            .await
            .map_err(|_| DbError::Timeout(limit))?,
        None => operation.await,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{file_database, Database, DbConfig};

    async fn count_users(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn insert_user(tx: &mut Transaction<'static, Sqlite>, name: &str) -> DbResult<()> {
        sqlx::query("INSERT INTO users (username, password_hash, balance) VALUES (?, 'x', 0)")
            .bind(name)
            .execute(&mut **tx)
            .await
            .step("insert user")?;
        Ok(())
    }

    #[tokio::test]
    async fn test_finish_commits_on_ok() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = begin(db.pool()).await.unwrap();
        let result = insert_user(&mut tx, "carol").await;
        finish(tx, result).await.unwrap();

        assert_eq!(count_users(db.pool()).await, 1);
    }

    #[tokio::test]
    async fn test_finish_rolls_back_and_keeps_original_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = begin(db.pool()).await.unwrap();
        let result = match insert_user(&mut tx, "carol").await {
            Ok(()) => Err::<(), _>(DbError::SelfTransfer),
            Err(e) => Err(e),
        };
        let err = finish(tx, result).await.unwrap_err();

        assert!(matches!(err, DbError::SelfTransfer));
        assert_eq!(count_users(db.pool()).await, 0);
    }

    #[tokio::test]
    async fn test_dropped_guard_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        {
            let mut tx = begin(db.pool()).await.unwrap();
            insert_user(&mut tx, "carol").await.unwrap();
        }

        // The single in-memory connection is usable again and saw no insert.
        assert_eq!(count_users(db.pool()).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_begin_waits_for_open_writer() {
        let (db, _dir) = file_database(4).await;

        let mut first = begin(db.pool()).await.unwrap();
        insert_user(&mut first, "carol").await.unwrap();

        let pool = db.pool().clone();
        let second = tokio::spawn(async move {
            let mut tx = begin(&pool).await?;
            let result = insert_user(&mut tx, "dave").await;
            finish(tx, result).await
        });

        // The write lock is taken at BEGIN, so the second unit cannot start.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!second.is_finished());

        finish(first, Ok(())).await.unwrap();
        second.await.unwrap().unwrap();

        assert_eq!(count_users(db.pool()).await, 2);
    }

    #[tokio::test]
    async fn test_deadline_elapses() {
        let err = with_deadline(Some(Duration::from_millis(10)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, DbError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_no_deadline_passes_through() {
        let value = with_deadline(None, async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
