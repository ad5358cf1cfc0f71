//! # Catalog Repository
//!
//! Item prices. The ledger only reads them; the `seed` binary writes them.

use std::time::Duration;

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbResult, StepContext};
use crate::unit_of_work::with_deadline;
use coinshop_core::Item;

/// Repository for the item catalog.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
    deadline: Option<Duration>,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool, deadline: Option<Duration>) -> Self {
        CatalogRepository { pool, deadline }
    }

    /// Gets an item by name.
    pub async fn get(&self, name: &str) -> DbResult<Option<Item>> {
        with_deadline(self.deadline, async {
            sqlx::query_as::<_, Item>("SELECT name, price FROM items WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .step("read item")
        })
        .await
    }

    /// Lists the whole catalog, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Item>> {
        with_deadline(self.deadline, async {
            sqlx::query_as::<_, Item>("SELECT name, price FROM items ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .step("list items")
        })
        .await
    }

    /// Inserts an item or updates its price.
    pub async fn upsert(&self, item: &Item) -> DbResult<()> {
        debug!(item = %item.name, price = %item.price, "Upserting catalog item");

        with_deadline(self.deadline, async {
            sqlx::query(
                r#"
                INSERT INTO items (name, price) VALUES (?, ?)
                ON CONFLICT (name) DO UPDATE SET price = excluded.price
                "#,
            )
            .bind(&item.name)
            .bind(item.price)
            .execute(&self.pool)
            .await
            .step("upsert item")?;
            Ok(())
        })
        .await
    }
}
