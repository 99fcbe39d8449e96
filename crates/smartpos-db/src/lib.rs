//! # smartpos-db: Store Storage
//!
//! The SQLite side of checkout: one pool per store file, an embedded
//! schema, and repositories whose write methods take a connection so the
//! checkout engine can run them inside its own transaction.
//!
//! ## What Lives Where
//! ```text
//!   table            repository                 written by checkout as
//!   ───────────────  ─────────────────────────  ──────────────────────────────
//!   queue_counters   QueueCounterRepository     reserve_next     (first write)
//!   products         ProductRepository          try_decrement_stock  (CAS)
//!   orders           OrderRepository            insert_order
//!   order_lines      OrderRepository            insert_lines     (snapshots)
//!   order_payments   OrderRepository            insert_payments
//! ```
//!
//! Reads (`get_committed`, `list_for_day`, catalog lookups) go straight to
//! the pool and never block the writer, since the file runs in WAL mode.
//!
//! ```rust,ignore
//! use smartpos_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./smartpos.db")).await?;
//! let today = db.orders().list_for_day(business_date).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::queue::QueueCounterRepository;
