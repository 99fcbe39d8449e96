//! # Queue Counter Repository
//!
//! Per-day queue numbers shown to customers and the kitchen.
//!
//! ## Atomic Increment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INSERT INTO queue_counters (business_date, last_number)               │
//! │  VALUES ('2026-10-19', 1)                                              │
//! │  ON CONFLICT (business_date)                                           │
//! │  DO UPDATE SET last_number = last_number + 1                           │
//! │  RETURNING last_number                                                 │
//! │                                                                         │
//! │  First order of the day ──► row created with 1                         │
//! │  Every later order      ──► row incremented, new value returned        │
//! │                                                                         │
//! │  One statement, one write lock: two registers can never read the       │
//! │  same value, and a rolled-back checkout gives its number back.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Repository for the `queue_counters` table.
#[derive(Debug, Clone)]
pub struct QueueCounterRepository {
    pool: SqlitePool,
}

impl QueueCounterRepository {
    /// Creates a new QueueCounterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        QueueCounterRepository { pool }
    }

    /// Last number handed out on `date`, `None` if no order that day.
    pub async fn last_number(&self, date: NaiveDate) -> DbResult<Option<i64>> {
        let last: Option<i64> =
            sqlx::query_scalar("SELECT last_number FROM queue_counters WHERE business_date = ?1")
                .bind(date)
                .fetch_optional(&self.pool)
                .await?;

        Ok(last)
    }

    /// Reserves the next queue number for `date` inside the caller's
    /// transaction.
    ///
    /// Must be the first write of the transaction: it takes SQLite's write
    /// lock, so every later statement in the same checkout runs serialized
    /// against other checkouts.
    pub async fn reserve_next(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<i64> {
        let number: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO queue_counters (business_date, last_number)
            VALUES (?1, 1)
            ON CONFLICT (business_date)
            DO UPDATE SET last_number = last_number + 1
            RETURNING last_number
            "#,
        )
        .bind(date)
        .fetch_one(&mut *conn)
        .await?;

        debug!(business_date = %date, queue_number = number, "Reserved queue number");

        Ok(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[tokio::test]
    async fn test_numbers_increase_per_day() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        assert_eq!(QueueCounterRepository::reserve_next(&mut conn, day(19)).await.unwrap(), 1);
        assert_eq!(QueueCounterRepository::reserve_next(&mut conn, day(19)).await.unwrap(), 2);
        assert_eq!(QueueCounterRepository::reserve_next(&mut conn, day(19)).await.unwrap(), 3);
        drop(conn);

        assert_eq!(db.queue_counters().last_number(day(19)).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_new_day_starts_at_one() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        QueueCounterRepository::reserve_next(&mut conn, day(19)).await.unwrap();
        QueueCounterRepository::reserve_next(&mut conn, day(19)).await.unwrap();
        assert_eq!(QueueCounterRepository::reserve_next(&mut conn, day(20)).await.unwrap(), 1);
        drop(conn);

        assert_eq!(db.queue_counters().last_number(day(21)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rolled_back_reservation_is_released() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        assert_eq!(QueueCounterRepository::reserve_next(&mut tx, day(19)).await.unwrap(), 1);
        tx.rollback().await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        assert_eq!(QueueCounterRepository::reserve_next(&mut tx, day(19)).await.unwrap(), 1);
        tx.commit().await.unwrap();
    }
}
