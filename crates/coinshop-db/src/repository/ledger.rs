//! # Ledger Repository
//!
//! Balances, transfers, purchases and transfer history.
//!
//! ## Mutations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Ledger Units of Work                              │
//! │                                                                         │
//! │  send_coin(from, "bob", 200)          buy_item(user, "cup")             │
//! │  ───────────────────────────          ─────────────────────             │
//! │  BEGIN                                BEGIN                             │
//! │   1. resolve recipient                 1. lookup price                  │
//! │   2. reject self transfer              2. debit buyer      (guarded)    │
//! │   3. debit sender      (guarded)       3. increment inventory           │
//! │   4. credit recipient                  4. insert inventory if absent    │
//! │   5. record transaction               COMMIT                            │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any failing step → ROLLBACK → nothing from steps 1..n is visible.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarded Debit
//! ```sql
//! UPDATE users SET balance = balance - ?1 WHERE id = ?2 AND balance >= ?1
//! ```
//! Zero rows means either no such user or not enough coins; a follow-up
//! existence probe tells the two apart. Two concurrent debits of the same
//! balance serialize on SQLite's write lock, so the second one sees the
//! first one's result.

use std::time::Duration;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult, Entity, StepContext};
use crate::unit_of_work::{self, with_deadline};
use coinshop_core::{CoinHistory, Coins, HistoryEntry, InventoryEntry, UserId};

/// Repository for ledger operations.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
    deadline: Option<Duration>,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool, deadline: Option<Duration>) -> Self {
        LedgerRepository { pool, deadline }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a user's balance.
    pub async fn get_balance(&self, user_id: UserId) -> DbResult<Coins> {
        with_deadline(self.deadline, async {
            sqlx::query_scalar::<_, Coins>("SELECT balance FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .step("read balance")?
                .ok_or_else(|| DbError::not_found(Entity::User, user_id.to_string()))
        })
        .await
    }

    /// Gets a user's inventory, ordered by item name.
    pub async fn get_inventory(&self, user_id: UserId) -> DbResult<Vec<InventoryEntry>> {
        with_deadline(self.deadline, async {
            sqlx::query_as::<_, InventoryEntry>(
                "SELECT item, quantity FROM inventory WHERE user_id = ? ORDER BY item",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .step("read inventory")
        })
        .await
    }

    /// Gets a user's transfer history, each direction in recorded order.
    ///
    /// The counterpart name comes from a LEFT JOIN, so a transfer whose
    /// other party has no user row still shows up, with no name.
    pub async fn get_coin_history(&self, user_id: UserId) -> DbResult<CoinHistory> {
        with_deadline(self.deadline, async {
            let sent = sqlx::query_as::<_, HistoryEntry>(
                r#"
                SELECT u.username AS counterpart, t.amount, t.created_at
                FROM transactions t
                LEFT JOIN users u ON u.id = t.to_user_id
                WHERE t.from_user_id = ?
                ORDER BY t.id
                "#,
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .step("read sent history")?;

            let received = sqlx::query_as::<_, HistoryEntry>(
                r#"
                SELECT u.username AS counterpart, t.amount, t.created_at
                FROM transactions t
                LEFT JOIN users u ON u.id = t.from_user_id
                WHERE t.to_user_id = ?
                ORDER BY t.id
                "#,
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .step("read received history")?;

            Ok(CoinHistory { sent, received })
        })
        .await
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Moves `amount` coins from `from` to the user named `to_username`.
    ///
    /// ## Errors
    /// * `NotFound(User)` - recipient unknown, or a debit/credit matched no row
    /// * `SelfTransfer` - recipient is the sender
    /// * `InsufficientBalance` - sender holds less than `amount`
    /// * `Step { .. }` - storage failure; nothing was applied
    pub async fn send_coin(&self, from: UserId, to_username: &str, amount: Coins) -> DbResult<()> {
        with_deadline(self.deadline, async {
            let mut tx = unit_of_work::begin(&self.pool).await?;
            let result = transfer_steps(&mut tx, from, to_username, amount).await;
            unit_of_work::finish(tx, result).await
        })
        .await?;

        info!(from = %from, to = %to_username, amount = %amount, "Transfer committed");
        Ok(())
    }

    /// Buys one unit of `item` for `user_id`. Returns the price paid.
    ///
    /// ## Errors
    /// * `NotFound(Item)` - item not in the catalog
    /// * `NotFound(User)` - buyer has no row
    /// * `InsufficientBalance` - buyer holds less than the price
    pub async fn buy_item(&self, user_id: UserId, item: &str) -> DbResult<Coins> {
        let price = with_deadline(self.deadline, async {
            let mut tx = unit_of_work::begin(&self.pool).await?;
            let result = purchase_steps(&mut tx, user_id, item).await;
            unit_of_work::finish(tx, result).await
        })
        .await?;

        info!(user_id = %user_id, item = %item, price = %price, "Purchase committed");
        Ok(price)
    }
}

// =============================================================================
// Unit-of-Work Steps
// =============================================================================

async fn transfer_steps(
    conn: &mut SqliteConnection,
    from: UserId,
    to_username: &str,
    amount: Coins,
) -> DbResult<()> {
    debug!(from = %from, to = %to_username, "resolve recipient");
    let to = sqlx::query_scalar::<_, UserId>("SELECT id FROM users WHERE username = ?")
        .bind(to_username)
        .fetch_optional(&mut *conn)
        .await
        .step("resolve recipient")?
        .ok_or_else(|| DbError::not_found(Entity::User, to_username))?;

    if to == from {
        return Err(DbError::SelfTransfer);
    }

    debug!(user_id = %from, amount = %amount, "debit sender");
    debit(conn, from, amount).await.step("debit sender")?;

    debug!(user_id = %to, amount = %amount, "credit recipient");
    let credited = sqlx::query("UPDATE users SET balance = balance + ? WHERE id = ?")
        .bind(amount)
        .bind(to)
        .execute(&mut *conn)
        .await
        .step("credit recipient")?;
    if credited.rows_affected() == 0 {
        return Err(DbError::not_found(Entity::User, to.to_string()));
    }

    debug!(from = %from, to = %to, "record transaction");
    sqlx::query(
        r#"
        INSERT INTO transactions (from_user_id, to_user_id, amount, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(from)
    .bind(to)
    .bind(amount)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .step("record transaction")?;

    Ok(())
}

async fn purchase_steps(conn: &mut SqliteConnection, user_id: UserId, item: &str) -> DbResult<Coins> {
    debug!(item = %item, "lookup price");
    let price = sqlx::query_scalar::<_, Coins>("SELECT price FROM items WHERE name = ?")
        .bind(item)
        .fetch_optional(&mut *conn)
        .await
        .step("lookup price")?
        .ok_or_else(|| DbError::not_found(Entity::Item, item))?;

    debug!(user_id = %user_id, price = %price, "debit buyer");
    debit(conn, user_id, price).await.step("debit buyer")?;

    // Increment first: a no-op for a first purchase. The conditioned insert
    // below is then a no-op for a repeat purchase.
    debug!(user_id = %user_id, item = %item, "increment inventory");
    sqlx::query("UPDATE inventory SET quantity = quantity + 1 WHERE user_id = ? AND item = ?")
        .bind(user_id)
        .bind(item)
        .execute(&mut *conn)
        .await
        .step("increment inventory")?;

    debug!(user_id = %user_id, item = %item, "insert inventory");
    sqlx::query(
        r#"
        INSERT INTO inventory (user_id, item, quantity)
        SELECT ?1, ?2, 1
        WHERE NOT EXISTS (SELECT 1 FROM inventory WHERE user_id = ?1 AND item = ?2)
        "#,
    )
    .bind(user_id)
    .bind(item)
    .execute(&mut *conn)
    .await
    .step("insert inventory")?;

    Ok(price)
}

/// Guarded debit. Never drives a balance below zero.
async fn debit(conn: &mut SqliteConnection, user_id: UserId, amount: Coins) -> DbResult<()> {
    let debited = sqlx::query("UPDATE users SET balance = balance - ?1 WHERE id = ?2 AND balance >= ?1")
        .bind(amount)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    if debited.rows_affected() == 1 {
        return Ok(());
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = ?)")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

    if exists {
        Err(DbError::InsufficientBalance {
            user_id,
            requested: amount,
        })
    } else {
        Err(DbError::not_found(Entity::User, user_id.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{file_database, Database, DbConfig};
    use coinshop_core::{Item, STARTING_BALANCE};

    async fn setup() -> (Database, UserId, UserId) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let alice = db.users().authenticate("alice", "hash-a").await.unwrap().id;
        let bob = db.users().authenticate("bob", "hash-b").await.unwrap().id;
        (db, alice, bob)
    }

    async fn total_balance(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT SUM(balance) FROM users")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn transaction_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_transfer_conserves_coins() {
        let (db, alice, bob) = setup().await;
        let before = total_balance(&db).await;

        db.ledger().send_coin(alice, "bob", Coins::new(200)).await.unwrap();

        assert_eq!(db.ledger().get_balance(alice).await.unwrap(), Coins::new(800));
        assert_eq!(db.ledger().get_balance(bob).await.unwrap(), Coins::new(1200));
        assert_eq!(total_balance(&db).await, before);
        assert_eq!(transaction_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_transfer_shows_in_both_histories() {
        let (db, alice, bob) = setup().await;

        db.ledger().send_coin(alice, "bob", Coins::new(200)).await.unwrap();
        db.ledger().send_coin(alice, "bob", Coins::new(5)).await.unwrap();

        let alice_history = db.ledger().get_coin_history(alice).await.unwrap();
        let bob_history = db.ledger().get_coin_history(bob).await.unwrap();

        assert!(alice_history.received.is_empty());
        assert_eq!(alice_history.sent.len(), 2);
        assert_eq!(alice_history.sent[0].counterpart.as_deref(), Some("bob"));
        assert_eq!(alice_history.sent[0].amount, Coins::new(200));
        assert_eq!(alice_history.sent[1].amount, Coins::new(5));

        assert_eq!(bob_history.received.len(), 2);
        assert_eq!(bob_history.received[0].counterpart.as_deref(), Some("alice"));
        assert_eq!(bob_history.total_received(), Coins::new(205));
    }

    #[tokio::test]
    async fn test_transfer_to_unknown_user() {
        let (db, alice, _) = setup().await;

        let err = db.ledger().send_coin(alice, "nobody", Coins::new(10)).await.unwrap_err();

        assert!(matches!(err, DbError::NotFound { entity: Entity::User, .. }));
        assert_eq!(db.ledger().get_balance(alice).await.unwrap(), STARTING_BALANCE);
        assert_eq!(transaction_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_transfer_to_self_rejected() {
        let (db, alice, _) = setup().await;

        let err = db.ledger().send_coin(alice, "alice", Coins::new(10)).await.unwrap_err();

        assert!(matches!(err, DbError::SelfTransfer));
        assert_eq!(db.ledger().get_balance(alice).await.unwrap(), STARTING_BALANCE);
    }

    #[tokio::test]
    async fn test_transfer_insufficient_balance_changes_nothing() {
        let (db, alice, bob) = setup().await;

        let err = db.ledger().send_coin(alice, "bob", Coins::new(1001)).await.unwrap_err();

        assert!(matches!(err, DbError::InsufficientBalance { .. }));
        assert_eq!(db.ledger().get_balance(alice).await.unwrap(), STARTING_BALANCE);
        assert_eq!(db.ledger().get_balance(bob).await.unwrap(), STARTING_BALANCE);
        assert_eq!(transaction_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_transfer_from_unknown_sender() {
        let (db, _, _) = setup().await;

        let err = db
            .ledger()
            .send_coin(UserId::new(999), "bob", Coins::new(10))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { entity: Entity::User, .. }));
    }

    #[tokio::test]
    async fn test_failed_credit_rolls_back_debit() {
        let (db, alice, bob) = setup().await;

        sqlx::query(&format!(
            r#"
            CREATE TRIGGER refuse_credit BEFORE UPDATE OF balance ON users
            WHEN NEW.id = {} AND NEW.balance > OLD.balance
            BEGIN
                SELECT RAISE(ABORT, 'credit refused');
            END
            "#,
            bob.get()
        ))
        .execute(db.pool())
        .await
        .unwrap();

        let err = db.ledger().send_coin(alice, "bob", Coins::new(300)).await.unwrap_err();

        assert!(matches!(err, DbError::Step { step: "credit recipient", .. }));
        assert_eq!(db.ledger().get_balance(alice).await.unwrap(), STARTING_BALANCE);
        assert_eq!(db.ledger().get_balance(bob).await.unwrap(), STARTING_BALANCE);
        assert_eq!(transaction_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_buy_twice_increments_quantity() {
        let (db, alice, _) = setup().await;

        let paid = db.ledger().buy_item(alice, "pen").await.unwrap();
        db.ledger().buy_item(alice, "pen").await.unwrap();

        assert_eq!(paid, Coins::new(10));
        let inventory = db.ledger().get_inventory(alice).await.unwrap();
        assert_eq!(
            inventory,
            vec![InventoryEntry {
                item: "pen".to_string(),
                quantity: 2
            }]
        );
        assert_eq!(db.ledger().get_balance(alice).await.unwrap(), Coins::new(980));
    }

    #[tokio::test]
    async fn test_inventory_is_ordered_by_item() {
        let (db, alice, _) = setup().await;

        db.ledger().buy_item(alice, "socks").await.unwrap();
        db.ledger().buy_item(alice, "book").await.unwrap();
        db.ledger().buy_item(alice, "cup").await.unwrap();

        let items: Vec<String> = db
            .ledger()
            .get_inventory(alice)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.item)
            .collect();
        assert_eq!(items, vec!["book", "cup", "socks"]);
    }

    #[tokio::test]
    async fn test_buy_unknown_item() {
        let (db, alice, _) = setup().await;

        let err = db.ledger().buy_item(alice, "yacht").await.unwrap_err();

        assert!(matches!(err, DbError::NotFound { entity: Entity::Item, .. }));
        assert_eq!(db.ledger().get_balance(alice).await.unwrap(), STARTING_BALANCE);
    }

    #[tokio::test]
    async fn test_buy_insufficient_balance_changes_nothing() {
        let (db, alice, _) = setup().await;
        db.catalog()
            .upsert(&Item {
                name: "yacht".to_string(),
                price: Coins::new(5000),
            })
            .await
            .unwrap();

        let err = db.ledger().buy_item(alice, "yacht").await.unwrap_err();

        assert!(matches!(err, DbError::InsufficientBalance { .. }));
        assert_eq!(db.ledger().get_balance(alice).await.unwrap(), STARTING_BALANCE);
        assert!(db.ledger().get_inventory(alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_spend_to_exactly_zero() {
        let (db, alice, _) = setup().await;

        db.ledger().send_coin(alice, "bob", STARTING_BALANCE).await.unwrap();

        assert_eq!(db.ledger().get_balance(alice).await.unwrap(), Coins::zero());
        let err = db.ledger().buy_item(alice, "pen").await.unwrap_err();
        assert!(matches!(err, DbError::InsufficientBalance { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfers_conserve_total() {
        let (db, _dir) = file_database(8).await;
        let alice = db.users().authenticate("alice", "hash-a").await.unwrap().id;
        let bob = db.users().authenticate("bob", "hash-b").await.unwrap().id;
        let before = total_balance(&db).await;

        let mut handles = Vec::new();
        for i in 0..40 {
            let ledger = db.ledger();
            let (from, to) = if i % 2 == 0 { (alice, "bob") } else { (bob, "alice") };
            handles.push(tokio::spawn(async move {
                ledger.send_coin(from, to, Coins::new(1)).await
            }));
        }

        let mut failures = Vec::new();
        for handle in handles {
            if let Err(err) = handle.await.unwrap() {
                failures.push(err.to_string());
            }
        }

        assert!(failures.is_empty(), "failed transfers: {:?}", failures);
        assert_eq!(total_balance(&db).await, before);
        assert_eq!(transaction_count(&db).await, 40);
        assert_eq!(db.ledger().get_balance(alice).await.unwrap(), STARTING_BALANCE);
        assert_eq!(db.ledger().get_balance(bob).await.unwrap(), STARTING_BALANCE);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_debits_never_go_negative() {
        let (db, _dir) = file_database(8).await;
        let alice = db.users().authenticate("alice", "hash-a").await.unwrap().id;

        // 10 purchases of 300 against 1000 coins: exactly 3 can succeed.
        let mut handles = Vec::new();
        for _ in 0..10 {
            let ledger = db.ledger();
            handles.push(tokio::spawn(async move { ledger.buy_item(alice, "hoody").await }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(DbError::InsufficientBalance { .. }) => {}
                Err(other) => panic!("unexpected error: {}", other),
            }
        }

        assert_eq!(succeeded, 3);
        assert_eq!(db.ledger().get_balance(alice).await.unwrap(), Coins::new(100));
        assert_eq!(
            db.ledger().get_inventory(alice).await.unwrap()[0].quantity,
            3
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfers_and_purchases_serialize() {
        let (db, _dir) = file_database(8).await;
        let alice = db.users().authenticate("alice", "hash-a").await.unwrap().id;
        let bob = db.users().authenticate("bob", "hash-b").await.unwrap().id;

        let mut handles = Vec::new();
        for i in 0..30 {
            let ledger = db.ledger();
            handles.push(tokio::spawn(async move {
                match i % 3 {
                    0 => ledger.send_coin(alice, "bob", Coins::new(5)).await,
                    1 => ledger.send_coin(bob, "alice", Coins::new(5)).await,
                    _ => ledger.buy_item(bob, "pen").await.map(|_| ()),
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // 10 pens at 10 coins left the ledger; transfers cancel out.
        assert_eq!(total_balance(&db).await, 2 * STARTING_BALANCE.amount() - 100);
        assert_eq!(transaction_count(&db).await, 20);
        assert_eq!(db.ledger().get_balance(alice).await.unwrap(), STARTING_BALANCE);
        assert_eq!(db.ledger().get_inventory(bob).await.unwrap()[0].quantity, 10);
    }

    #[tokio::test]
    async fn test_history_keeps_entry_without_counterpart() {
        let (db, alice, _) = setup().await;
        db.ledger().send_coin(alice, "bob", Coins::new(10)).await.unwrap();

        // Orphan the receiving side.
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("DELETE FROM users WHERE username = 'bob'")
            .execute(db.pool())
            .await
            .unwrap();

        let history = db.ledger().get_coin_history(alice).await.unwrap();
        assert_eq!(history.sent.len(), 1);
        assert_eq!(history.sent[0].counterpart, None);
    }

    #[tokio::test]
    async fn test_balance_of_unknown_user() {
        let (db, _, _) = setup().await;
        let err = db.ledger().get_balance(UserId::new(42)).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { entity: Entity::User, .. }));
    }

    #[tokio::test]
    async fn test_operation_timeout() {
        let config = DbConfig::in_memory().operation_timeout(Some(Duration::from_millis(50)));
        let db = Database::new(config).await.unwrap();
        let alice = db.users().authenticate("alice", "hash-a").await.unwrap().id;

        // Hold the only connection so the read has to wait past its deadline.
        let held = db.pool().acquire().await.unwrap();
        let err = db.ledger().get_balance(alice).await.unwrap_err();
        drop(held);

        assert!(matches!(err, DbError::Timeout(_)));
    }
}
