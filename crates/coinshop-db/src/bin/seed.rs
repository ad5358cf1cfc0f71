//! # Catalog Seeder
//!
//! Writes item prices into the catalog.
//!
//! ## Usage
//! ```bash
//! # Restore the default merch prices
//! cargo run -p coinshop-db --bin seed
//!
//! # Load prices from a file
//! cargo run -p coinshop-db --bin seed -- --catalog ./catalog.toml
//!
//! # Specify database path
//! cargo run -p coinshop-db --bin seed -- --db ./data/coinshop.db
//! ```
//!
//! ## Catalog File
//! ```toml
//! [items]
//! cup = 20
//! pink-hoody = 500
//! ```
//!
//! Existing items get the new price, new items are added. Nothing is
//! removed.

use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;

use coinshop_core::validation::{validate_item_name, validate_price};
use coinshop_core::{Coins, Item};
use coinshop_db::{Database, DbConfig};

/// The merch catalog shipped with the service.
const DEFAULT_CATALOG: &[(&str, i64)] = &[
    ("t-shirt", 80),
    ("cup", 20),
    ("book", 50),
    ("pen", 10),
    ("powerbank", 200),
    ("hoody", 300),
    ("umbrella", 200),
    ("socks", 10),
    ("wallet", 50),
    ("pink-hoody", 500),
];

#[derive(Debug, Deserialize)]
struct CatalogFile {
    items: BTreeMap<String, i64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./coinshop.db");
    let mut catalog_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--catalog" | "-c" => {
                if i + 1 < args.len() {
                    catalog_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Coinshop Catalog Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --catalog <FILE>  TOML file with an [items] table (default: built-in merch)");
                println!("  -d, --db <PATH>       Database file path (default: ./coinshop.db)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            other => bail!("unknown argument: {}", other),
        }
        i += 1;
    }

    let items = match &catalog_path {
        Some(path) => load_catalog(Path::new(path))?,
        None => default_catalog(),
    };

    println!("Coinshop Catalog Seeder");
    println!("=======================");
    println!("Database: {}", db_path);
    println!("Items:    {}", items.len());
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {}", db_path))?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    for item in &items {
        db.catalog()
            .upsert(item)
            .await
            .with_context(|| format!("writing {}", item.name))?;
        println!("  {:<12} {}", item.name, item.price);
    }

    let total = db.catalog().list().await?.len();
    db.close().await;

    println!();
    println!("✓ Catalog now holds {} items", total);

    Ok(())
}

fn default_catalog() -> Vec<Item> {
    DEFAULT_CATALOG
        .iter()
        .map(|(name, price)| Item {
            name: name.to_string(),
            price: Coins::new(*price),
        })
        .collect()
}

/// Reads and validates a catalog file.
fn load_catalog(path: &Path) -> anyhow::Result<Vec<Item>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let file: CatalogFile =
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    file.items
        .into_iter()
        .map(|(name, price)| -> anyhow::Result<Item> {
            let price = Coins::new(price);
            validate_item_name(&name)?;
            validate_price(price).with_context(|| format!("item {}", name))?;
            Ok(Item { name, price })
        })
        .collect()
}
