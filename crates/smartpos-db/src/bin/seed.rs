//! Loads a demo café menu into a store database.
//!
//! ```bash
//! cargo run -p smartpos-db --bin seed
//! cargo run -p smartpos-db --bin seed -- --count 10 --db ./data/smartpos.db
//! ```
//!
//! SKUs are `{CATEGORY}-{NN}`. Cost sits at 35-44% of price and stock
//! between 5 and 50, both derived from the item's position so reruns on a
//! fresh file produce the same catalog. A file that already has products
//! is left alone.

use chrono::Utc;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use smartpos_core::validation::{validate_product_name, validate_sku};
use smartpos_core::{Money, Product};
use smartpos_db::{Database, DbConfig};

const USAGE: &str = "\
seed [--db <PATH>] [--count <N>]

  -d, --db <PATH>    store database (default ./smartpos_dev.db)
  -c, --count <N>    insert only the first N menu items
  -h, --help         print this text";

/// Menu categories: (SKU prefix, [(name, price in minor units)])
const MENU: &[(&str, &[(&str, i64)])] = &[
    (
        "KOPI",
        &[
            ("Espresso", 18_000),
            ("Americano", 22_000),
            ("Kopi Susu Gula Aren", 25_000),
            ("Cappuccino", 28_000),
            ("Cafe Latte", 28_000),
            ("Vietnam Drip", 24_000),
        ],
    ),
    (
        "NONKOPI",
        &[
            ("Es Teh Manis", 8_000),
            ("Teh Tarik", 15_000),
            ("Matcha Latte", 30_000),
            ("Coklat Panas", 26_000),
            ("Jus Alpukat", 22_000),
        ],
    ),
    (
        "MAKAN",
        &[
            ("Nasi Goreng Spesial", 35_000),
            ("Mie Goreng Jawa", 32_000),
            ("Ayam Geprek", 30_000),
            ("Nasi Ayam Bakar", 38_000),
            ("Soto Ayam", 28_000),
        ],
    ),
    (
        "SNACK",
        &[
            ("Pisang Goreng", 15_000),
            ("Kentang Goreng", 20_000),
            ("Roti Bakar Coklat", 18_000),
            ("Tahu Crispy", 15_000),
        ],
    ),
];

struct SeedArgs {
    db_path: PathBuf,
    limit: Option<usize>,
}

/// `None` when help was requested.
fn parse_args(mut args: impl Iterator<Item = String>) -> Option<SeedArgs> {
    let mut parsed = SeedArgs {
        db_path: PathBuf::from("./smartpos_dev.db"),
        limit: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-d" | "--db" => match args.next() {
                Some(path) => parsed.db_path = PathBuf::from(path),
                None => warn!("--db needs a path"),
            },
            "-c" | "--count" => match args.next().map(|n| n.parse::<usize>()) {
                Some(Ok(n)) => parsed.limit = Some(n),
                _ => warn!("--count needs a number, seeding the full menu"),
            },
            "-h" | "--help" => return None,
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
    }

    Some(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,smartpos=debug,sqlx=warn")),
        )
        .init();

    let Some(args) = parse_args(std::env::args().skip(1)) else {
        println!("{USAGE}");
        return Ok(());
    };

    let db = Database::new(DbConfig::new(&args.db_path)).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(
            path = %args.db_path.display(),
            existing,
            "Catalog already populated, nothing to do"
        );
        db.close().await;
        return Ok(());
    }

    let started = Instant::now();
    let menu = MENU
        .iter()
        .flat_map(|(category, items)| {
            items
                .iter()
                .enumerate()
                .map(move |(idx, (name, price))| (*category, idx, *name, *price))
        })
        .take(args.limit.unwrap_or(usize::MAX));

    let mut inserted = 0usize;
    for (position, (category, idx, name, price)) in menu.enumerate() {
        let product = menu_product(category, idx, name, price, position);

        let checked = product
            .sku
            .as_deref()
            .map_or(Ok(()), validate_sku)
            .and_then(|_| validate_product_name(&product.name));
        if let Err(e) = checked {
            warn!(name, error = %e, "Skipping invalid menu item");
            continue;
        }

        match db.products().insert(&product).await {
            Ok(()) => {
                println!(
                    "{:<12} {:<22} {}",
                    product.sku.as_deref().unwrap_or("-"),
                    product.name,
                    product.price()
                );
                inserted += 1;
            }
            Err(e) => warn!(name, error = %e, "Insert failed"),
        }
    }

    info!(
        inserted,
        path = %args.db_path.display(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Menu seeded"
    );

    db.close().await;
    Ok(())
}

fn menu_product(category: &str, idx: usize, name: &str, price: i64, position: usize) -> Product {
    let cost = price * (35 + (position % 10) as i64) / 100;
    let stock = 5 + ((position * 7) % 46) as i64;

    Product::new(name, Money::from_minor(price), stock, Utc::now())
        .with_sku(format!("{category}-{:02}", idx + 1))
        .with_cost(Money::from_minor(cost))
}
