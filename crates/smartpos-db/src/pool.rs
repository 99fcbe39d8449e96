//! # Store Database Handle
//!
//! Opens the shop's SQLite file, applies the pragmas every checkout relies
//! on, and hands out repositories.
//!
//! ## Registers Sharing One File
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     One store, one SQLite file                          │
//! │                                                                         │
//! │   Register 1 ─┐                                                        │
//! │   Register 2 ─┼──► SqlitePool (max_connections) ──► smartpos.db (WAL)  │
//! │   History UI ─┘                                                        │
//! │                                                                         │
//! │   Pragmas applied to every pooled connection:                          │
//! │   ─────────────────────────────────────────                            │
//! │   journal_mode = WAL      readers never wait for the checkout writer   │
//! │   synchronous  = NORMAL   durable at checkpoint, fast commits          │
//! │   foreign_keys = ON       order_lines → orders / products              │
//! │   busy_timeout = N ms     a second register queues for the write lock  │
//! │                           instead of failing with SQLITE_BUSY          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `:memory:` gives each connection its own private database, so the
//! in-memory configuration is pinned to a single connection.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::order::OrderRepository;
use crate::repository::product::ProductRepository;
use crate::repository::queue::QueueCounterRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// How to open the store database.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("./smartpos.db")
///     .max_connections(4)
///     .busy_timeout(Duration::from_secs(2));
/// let db = Database::new(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file; created on first open.
    pub database_path: PathBuf,

    /// Upper bound on pooled connections (5: a few registers plus a reader).
    pub max_connections: u32,

    /// Connections kept open while idle.
    pub min_connections: u32,

    /// How long a caller may wait for a free pooled connection.
    pub acquire_timeout: Duration,

    /// Idle connections older than this are closed.
    pub idle_timeout: Duration,

    /// How long a statement waits on another writer's lock.
    pub busy_timeout: Duration,

    /// Apply embedded migrations when the pool opens.
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Private in-memory database on a single connection. Test use.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(1),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let base = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
        };

        Ok(base
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the store database.
///
/// Clones share one pool. Repositories borrow a clone of it; the checkout
/// engine opens its own transactions through [`Database::pool`].
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./smartpos.db")).await?;
/// let menu_item = db.products().get_by_id(&id).await?;
/// let receipt = db.orders().get_committed(&order_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening store database");

        let options = config.connect_options()?;
        debug!(
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            max_connections = config.max_connections,
            "SQLite options ready"
        );

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        info!("Store database ready");
        Ok(db)
    }

    /// Wraps a pool opened elsewhere. No migrations are applied.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Database { pool }
    }

    /// Applies pending migrations. Safe to call repeatedly.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    pub fn queue_counters(&self) -> QueueCounterRepository {
        QueueCounterRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(&self) {
        info!("Closing store database");
        self.pool.close().await;
    }

    /// `true` if a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
