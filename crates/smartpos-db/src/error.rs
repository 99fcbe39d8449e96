//! # Storage Errors
//!
//! `DbError` is what every repository returns. The checkout engine only
//! needs to ask it two questions: "was this lock contention?" and "was
//! this the queue-number index?".
//!
//! ## Classification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error                                                           │
//! │     │                                                                   │
//! │     ├── Database(e), code in SQLITE_BUSY_CODES ──► Busy                │
//! │     ├── Database(e), kind() == UniqueViolation ──► UniqueViolation     │
//! │     ├── Database(e), kind() == ForeignKey      ──► ForeignKeyViolation │
//! │     ├── Database(e), kind() == Check/NotNull   ──► CheckViolation      │
//! │     ├── Database(e), anything else             ──► QueryFailed         │
//! │     ├── PoolTimedOut                           ──► PoolExhausted       │
//! │     ├── PoolClosed                             ──► ConnectionFailed    │
//! │     └── other                                  ──► Internal            │
//! │                                                                         │
//! │  Checkout retry: is_busy() || is_queue_collision()                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::{DatabaseError, ErrorKind};
use thiserror::Error;

/// Extended SQLite result codes for lock contention.
///
/// 5 BUSY, 6 LOCKED, 261 BUSY_RECOVERY, 262 LOCKED_SHAREDCACHE,
/// 517 BUSY_SNAPSHOT, 773 BUSY_TIMEOUT.
const SQLITE_BUSY_CODES: &[&str] = &["5", "6", "261", "262", "517", "773"];

/// Result type for repository calls.
pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// A row looked up by key does not exist.
    #[error("{entity} {id} does not exist")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the write.
    ///
    /// `field` is SQLite's column list, e.g.
    /// `orders.business_date, orders.queue_number` or `products.sku`.
    #[error("Duplicate value for {field}")]
    UniqueViolation { field: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK or NOT NULL rejected the row (negative stock, unknown enum text).
    #[error("Constraint failed: {message}")]
    CheckViolation { message: String },

    /// Another connection held the write lock past `busy_timeout`.
    #[error("Database busy: {0}")]
    Busy(String),

    /// No pooled connection became free within the acquire timeout.
    #[error("No database connection available")]
    PoolExhausted,

    #[error("Cannot open database: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Unexpected database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Lock contention that a later attempt may not hit.
    pub fn is_busy(&self) -> bool {
        matches!(self, DbError::Busy(_) | DbError::PoolExhausted)
    }

    /// Two orders tried to take the same queue number for one day.
    pub fn is_queue_collision(&self) -> bool {
        matches!(self, DbError::UniqueViolation { field } if field.contains("queue_number"))
    }

    fn from_database(err: &dyn DatabaseError) -> Self {
        let message = err.message().to_string();

        let busy = err
            .code()
            .is_some_and(|code| SQLITE_BUSY_CODES.contains(&code.as_ref()));
        if busy || message.contains("database is locked") {
            return DbError::Busy(message);
        }

        match err.kind() {
            // "UNIQUE constraint failed: orders.business_date, orders.queue_number"
            ErrorKind::UniqueViolation => DbError::UniqueViolation {
                field: message
                    .split_once(": ")
                    .map(|(_, columns)| columns.to_string())
                    .unwrap_or(message),
            },
            ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
            ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                DbError::CheckViolation { message }
            }
            _ => DbError::QueryFailed(message),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DbError::from_database(db_err.as_ref()),
            sqlx::Error::RowNotFound => DbError::not_found("Row", "?"),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[test]
    fn test_queue_collision_detection() {
        let err = DbError::UniqueViolation {
            field: "orders.business_date, orders.queue_number".to_string(),
        };
        assert!(err.is_queue_collision());
        assert!(!err.is_busy());

        let err = DbError::UniqueViolation {
            field: "products.sku".to_string(),
        };
        assert!(!err.is_queue_collision());
    }

    #[test]
    fn test_busy_detection() {
        assert!(DbError::Busy("database is locked".into()).is_busy());
        assert!(DbError::PoolExhausted.is_busy());
        assert!(!DbError::QueryFailed("syntax error".into()).is_busy());
    }

    #[test]
    fn test_pool_errors() {
        assert!(matches!(DbError::from(sqlx::Error::PoolTimedOut), DbError::PoolExhausted));
        assert!(matches!(DbError::from(sqlx::Error::RowNotFound), DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_sqlite_errors_are_classified() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        sqlx::query("INSERT INTO queue_counters (business_date, last_number) VALUES ('2026-10-19', 1)")
            .execute(db.pool())
            .await
            .unwrap();

        let dup: DbError = sqlx::query(
            "INSERT INTO queue_counters (business_date, last_number) VALUES ('2026-10-19', 2)",
        )
        .execute(db.pool())
        .await
        .unwrap_err()
        .into();
        assert!(matches!(&dup, DbError::UniqueViolation { field } if field == "queue_counters.business_date"));

        let check: DbError = sqlx::query(
            "INSERT INTO queue_counters (business_date, last_number) VALUES ('2026-10-20', 0)",
        )
        .execute(db.pool())
        .await
        .unwrap_err()
        .into();
        assert!(matches!(check, DbError::CheckViolation { .. }));

        let syntax: DbError = sqlx::query("SELEC 1").execute(db.pool()).await.unwrap_err().into();
        assert!(matches!(syntax, DbError::QueryFailed(_)));
    }
}
