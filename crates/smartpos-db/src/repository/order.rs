//! # Order Repository
//!
//! Committed orders: header, line snapshots and payments.
//!
//! ## Write Side vs Read Side
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  WRITE (inside the checkout transaction, associated fns)               │
//! │     insert_order(conn, &Order)                                         │
//! │     insert_lines(conn, &[OrderLine])                                   │
//! │     insert_payments(conn, &[OrderPayment])                             │
//! │                                                                         │
//! │  READ (pool, after commit)                                             │
//! │     get_by_id(id)          → Order                                     │
//! │     get_committed(id)      → Order + lines + payments  (reprint)       │
//! │     list_between(a, b)     → Order[] newest first      (history)       │
//! │     list_for_day(d)        → Order[] newest first                      │
//! │                                                                         │
//! │  Orders are never updated. There is no UPDATE statement in this file.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use smartpos_core::{CommittedOrder, Order, OrderLine, OrderPayment};

const ORDER_COLUMNS: &str = r#"
    id, created_at, business_date, queue_number, order_type, table_number,
    customer_name, customer_phone, member_id, discount_id, cashier_id,
    subtotal_minor, discount_minor, tax_minor, total_minor,
    tax_name_snapshot, tax_rate_bps_snapshot,
    payment_method, amount_tendered_minor, change_minor
"#;

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order header by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets an order with its lines and payments, both in cart/tender order.
    ///
    /// This is what receipt reprints consume.
    pub async fn get_committed(&self, id: &str) -> DbResult<Option<CommittedOrder>> {
        let Some(order) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let lines = self.get_lines(id).await?;
        let payments = self.get_payments(id).await?;

        Ok(Some(CommittedOrder {
            order,
            lines,
            payments,
        }))
    }

    /// Gets the lines of an order in cart order.
    pub async fn get_lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let lines = sqlx::query_as::<_, OrderLine>(
            r#"
            SELECT
                id, order_id, product_id, product_name_snapshot, sku_snapshot,
                cost_price_minor_snapshot, quantity, price_at_time_minor,
                line_total_minor, position
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Gets the payments of an order in tender order.
    pub async fn get_payments(&self, order_id: &str) -> DbResult<Vec<OrderPayment>> {
        let payments = sqlx::query_as::<_, OrderPayment>(
            r#"
            SELECT id, order_id, method, amount_minor, reference_id, position, created_at
            FROM order_payments
            WHERE order_id = ?1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Orders whose business date falls in `from..=to`, newest first.
    ///
    /// Within a day, newest means highest queue number.
    pub async fn list_between(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Order>> {
        debug!(%from, %to, "Listing orders");

        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE business_date >= ?1 AND business_date <= ?2
            ORDER BY business_date DESC, queue_number DESC
            "#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Orders of a single business day, newest first.
    pub async fn list_for_day(&self, date: NaiveDate) -> DbResult<Vec<Order>> {
        self.list_between(date, date).await
    }

    /// Counts all orders (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Transactional inserts (caller owns the transaction)
    // =========================================================================

    /// Inserts the order header.
    pub async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
        debug!(
            id = %order.id,
            queue_number = order.queue_number,
            total = order.total_minor,
            "Inserting order"
        );

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, created_at, business_date, queue_number, order_type, table_number,
                customer_name, customer_phone, member_id, discount_id, cashier_id,
                subtotal_minor, discount_minor, tax_minor, total_minor,
                tax_name_snapshot, tax_rate_bps_snapshot,
                payment_method, amount_tendered_minor, change_minor
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15,
                ?16, ?17,
                ?18, ?19, ?20
            )
            "#,
        )
        .bind(&order.id)
        .bind(order.created_at)
        .bind(order.business_date)
        .bind(order.queue_number)
        .bind(order.order_type)
        .bind(&order.table_number)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.member_id)
        .bind(&order.discount_id)
        .bind(&order.cashier_id)
        .bind(order.subtotal_minor)
        .bind(order.discount_minor)
        .bind(order.tax_minor)
        .bind(order.total_minor)
        .bind(&order.tax_name_snapshot)
        .bind(order.tax_rate_bps_snapshot)
        .bind(order.payment_method)
        .bind(order.amount_tendered_minor)
        .bind(order.change_minor)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts line snapshots, one row per cart line.
    pub async fn insert_lines(conn: &mut SqliteConnection, lines: &[OrderLine]) -> DbResult<()> {
        for line in lines {
            debug!(
                order_id = %line.order_id,
                product_id = ?line.product_id,
                quantity = line.quantity,
                "Inserting order line"
            );

            sqlx::query(
                r#"
                INSERT INTO order_lines (
                    id, order_id, product_id, product_name_snapshot, sku_snapshot,
                    cost_price_minor_snapshot, quantity, price_at_time_minor,
                    line_total_minor, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&line.id)
            .bind(&line.order_id)
            .bind(&line.product_id)
            .bind(&line.product_name_snapshot)
            .bind(&line.sku_snapshot)
            .bind(line.cost_price_minor_snapshot)
            .bind(line.quantity)
            .bind(line.price_at_time_minor)
            .bind(line.line_total_minor)
            .bind(line.position)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Inserts payment rows, one per tender.
    pub async fn insert_payments(
        conn: &mut SqliteConnection,
        payments: &[OrderPayment],
    ) -> DbResult<()> {
        for payment in payments {
            debug!(
                order_id = %payment.order_id,
                method = ?payment.method,
                amount = payment.amount_minor,
                "Recording payment"
            );

            sqlx::query(
                r#"
                INSERT INTO order_payments (
                    id, order_id, method, amount_minor, reference_id, position, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&payment.id)
            .bind(&payment.order_id)
            .bind(payment.method)
            .bind(payment.amount_minor)
            .bind(&payment.reference_id)
            .bind(payment.position)
            .bind(payment.created_at)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}

/// Generates a new row ID (order, line or payment).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::{TimeZone, Utc};
    use smartpos_core::{OrderType, PaymentLabel, PaymentMethod};

    fn order(date: NaiveDate, queue_number: i64) -> Order {
        Order {
            id: generate_id(),
            created_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap(),
            business_date: date,
            queue_number,
            order_type: OrderType::DineIn,
            table_number: "4".to_string(),
            customer_name: "Guest".to_string(),
            customer_phone: None,
            member_id: Some("member-1".to_string()),
            discount_id: None,
            cashier_id: Some("cashier-7".to_string()),
            subtotal_minor: 30_000,
            discount_minor: 0,
            tax_minor: 3_000,
            total_minor: 33_000,
            tax_name_snapshot: "PB1".to_string(),
            tax_rate_bps_snapshot: 1000,
            payment_method: PaymentLabel::Cash,
            amount_tendered_minor: 50_000,
            change_minor: 17_000,
        }
    }

    fn line(order_id: &str, position: i64) -> OrderLine {
        OrderLine {
            id: generate_id(),
            order_id: order_id.to_string(),
            product_id: None,
            product_name_snapshot: format!("Item {position}"),
            sku_snapshot: None,
            cost_price_minor_snapshot: 5_000,
            quantity: 1,
            price_at_time_minor: 15_000,
            line_total_minor: 15_000,
            position,
        }
    }

    fn payment(order_id: &str, position: i64) -> OrderPayment {
        OrderPayment {
            id: generate_id(),
            order_id: order_id.to_string(),
            method: PaymentMethod::Cash,
            amount_minor: 50_000,
            reference_id: None,
            position,
            created_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    async fn insert_full(db: &Database, order: &Order, lines: &[OrderLine], payments: &[OrderPayment]) {
        let mut tx = db.pool().begin().await.unwrap();
        OrderRepository::insert_order(&mut tx, order).await.unwrap();
        OrderRepository::insert_lines(&mut tx, lines).await.unwrap();
        OrderRepository::insert_payments(&mut tx, payments).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_round_trip_committed_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let header = order(day(19), 1);
        // inserted out of order on purpose; reads come back by position
        let lines = vec![line(&header.id, 1), line(&header.id, 0)];
        let payments = vec![payment(&header.id, 0)];
        insert_full(&db, &header, &lines, &payments).await;

        let loaded = db.orders().get_committed(&header.id).await.unwrap().unwrap();
        assert_eq!(loaded.order, header);
        assert_eq!(loaded.lines.len(), 2);
        assert_eq!(loaded.lines[0], lines[1]);
        assert_eq!(loaded.lines[1], lines[0]);
        assert_eq!(loaded.payments, payments);
        assert_eq!(loaded.total_paid().minor(), 50_000);

        assert!(db.orders().get_committed("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_queue_number_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert_full(&db, &order(day(19), 1), &[], &[]).await;

        let mut tx = db.pool().begin().await.unwrap();
        let err = OrderRepository::insert_order(&mut tx, &order(day(19), 1))
            .await
            .unwrap_err();
        assert!(err.is_queue_collision());
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_inclusive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (d, q) in [(18, 1), (19, 1), (19, 2), (20, 1), (21, 1)] {
            insert_full(&db, &order(day(d), q), &[], &[]).await;
        }

        let orders = db.orders().list_between(day(19), day(20)).await.unwrap();
        let keys: Vec<_> = orders
            .iter()
            .map(|o| (o.business_date, o.queue_number))
            .collect();
        assert_eq!(keys, vec![(day(20), 1), (day(19), 2), (day(19), 1)]);

        let today = db.orders().list_for_day(day(19)).await.unwrap();
        assert_eq!(today.len(), 2);
        assert_eq!(today[0].queue_number, 2);

        assert_eq!(db.orders().count().await.unwrap(), 5);
    }
}
