//! # Schema Migrations
//!
//! The schema ships inside the binary. Opening a [`Database`](crate::Database)
//! brings any store file up to the current version before the first checkout.
//!
//! ```text
//!   migrations/sqlite/                 _sqlx_migrations (in smartpos.db)
//!   ──────────────────                 ─────────────────────────────────
//!   001_initial_schema.sql  ──────►    version 1, checksum, applied_at
//!     products
//!     queue_counters
//!     orders          (UNIQUE business_date, queue_number)
//!     order_lines
//!     order_payments
//! ```
//!
//! Applied files are checksummed. Schema changes go in a new numbered file;
//! editing `001` after it has shipped makes every existing store refuse to open.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

/// Tables the checkout engine writes to.
pub const CHECKOUT_TABLES: &[&str] = &[
    "products",
    "queue_counters",
    "orders",
    "order_lines",
    "order_payments",
];

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every migration not yet recorded in `_sqlx_migrations`.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let shipped = MIGRATOR.migrations.len();
    debug!(shipped, "Applying schema migrations");

    MIGRATOR.run(pool).await?;

    info!(version = shipped, "Store schema is current");
    Ok(())
}

/// `(shipped, applied)` migration counts.
///
/// A store that was never migrated reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let shipped = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((shipped, applied.max(0) as usize))
}

/// Checkout tables missing from the connected database.
pub async fn missing_tables(pool: &SqlitePool) -> DbResult<Vec<&'static str>> {
    let present: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(pool)
            .await?;

    Ok(CHECKOUT_TABLES
        .iter()
        .copied()
        .filter(|table| !present.iter().any(|name| name == table))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_open_applies_full_schema() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let (shipped, applied) = migration_status(db.pool()).await.unwrap();
        assert!(shipped >= 1);
        assert_eq!(shipped, applied);
        assert!(missing_tables(db.pool()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unmigrated_store_reports_missing_tables() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();

        let (_, applied) = migration_status(db.pool()).await.unwrap();
        assert_eq!(applied, 0);
        assert_eq!(missing_tables(db.pool()).await.unwrap(), CHECKOUT_TABLES.to_vec());

        db.run_migrations().await.unwrap();
        db.run_migrations().await.unwrap();
        assert!(missing_tables(db.pool()).await.unwrap().is_empty());
    }
}
