//! # Product Repository
//!
//! Catalog rows as seen by the checkout engine.
//!
//! ## Key Operations
//! - Catalog lookup (`get_by_id`, `fetch_for_checkout`)
//! - Compare-and-swap stock decrement inside a checkout transaction
//! - Minimal CRUD used by the seed binary and tests
//!
//! ## Stock Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    No-Oversell Strategy                                 │
//! │                                                                         │
//! │  ❌ WRONG: read, compare in Rust, write absolute value                 │
//! │     SELECT stock ...; UPDATE products SET stock = 0 WHERE id = ?       │
//! │     Two registers both read 1 and both "sell the last unit".           │
//! │                                                                         │
//! │  ✅ CORRECT: guarded delta                                              │
//! │     UPDATE products SET stock = stock - ?qty                           │
//! │     WHERE id = ? AND stock >= ?qty                                      │
//! │     rows_affected == 1 → decremented                                   │
//! │     rows_affected == 0 → someone else got there first                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use smartpos_core::Product;

const PRODUCT_COLUMNS: &str = "id, sku, name, price_minor, cost_price_minor, stock, is_active, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// repo.insert(&product).await?;
/// let product = repo.get_by_id(&product.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found (active or not)
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = ?product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, price_minor, cost_price_minor,
                stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_minor)
        .bind(product.cost_price_minor)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates name, SKU, prices, stock and active flag.
    ///
    /// Past order lines are unaffected: they hold their own snapshot.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?2,
                name = ?3,
                price_minor = ?4,
                cost_price_minor = ?5,
                stock = ?6,
                is_active = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_minor)
        .bind(product.cost_price_minor)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Sets the absolute stock level (restocking, stock take).
    pub async fn set_stock(&self, id: &str, stock: i64) -> DbResult<()> {
        debug!(id = %id, stock, "Setting stock");

        let result = sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(stock)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Hard-deletes a product.
    ///
    /// Order lines keep their snapshot; their `product_id` becomes NULL.
    ///
    /// ## Returns
    /// * `Ok(true)` - Row deleted
    /// * `Ok(false)` - No such product
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts active products (for diagnostics and the seed binary).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Transactional helpers (caller owns the transaction)
    // =========================================================================

    /// Re-reads a sellable product inside a checkout transaction.
    ///
    /// Inactive products are treated as gone.
    pub async fn fetch_for_checkout(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND is_active = 1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(product)
    }

    /// Takes `quantity` units from stock if at least that many remain.
    ///
    /// ## Returns
    /// * `Ok(true)` - Stock decremented
    /// * `Ok(false)` - Not enough stock (or product gone); nothing changed
    pub async fn try_decrement_stock(
        conn: &mut SqliteConnection,
        id: &str,
        quantity: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?2, updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        debug!(id = %id, quantity, decremented = result.rows_affected() == 1, "Stock decrement");

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use smartpos_core::Money;

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn kopi(stock: i64) -> Product {
        Product::new("Kopi Susu", Money::from_minor(18_000), stock, Utc::now())
            .with_sku("KOPI-SUSU")
            .with_cost(Money::from_minor(7_000))
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = setup().await;
        let product = kopi(10);
        db.products().insert(&product).await.unwrap();

        let loaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Kopi Susu");
        assert_eq!(loaded.sku.as_deref(), Some("KOPI-SUSU"));
        assert_eq!(loaded.price_minor, 18_000);
        assert_eq!(loaded.cost_price_minor, 7_000);
        assert_eq!(loaded.stock, 10);
        assert!(loaded.is_active);

        assert!(db.products().get_by_id("missing").await.unwrap().is_none());
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = setup().await;
        db.products().insert(&kopi(1)).await.unwrap();

        let err = db.products().insert(&kopi(1)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_and_set_stock() {
        let db = setup().await;
        let mut product = kopi(5);
        db.products().insert(&product).await.unwrap();

        product.name = "Kopi Susu Gula Aren".to_string();
        product.price_minor = 20_000;
        db.products().update(&product).await.unwrap();
        db.products().set_stock(&product.id, 42).await.unwrap();

        let loaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Kopi Susu Gula Aren");
        assert_eq!(loaded.price_minor, 20_000);
        assert_eq!(loaded.stock, 42);

        let err = db.products().set_stock("missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_negative_stock_rejected_by_schema() {
        let db = setup().await;
        let product = kopi(1);
        db.products().insert(&product).await.unwrap();

        let err = db.products().set_stock(&product.id, -1).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = setup().await;
        let product = kopi(1);
        db.products().insert(&product).await.unwrap();

        assert!(db.products().delete(&product.id).await.unwrap());
        assert!(!db.products().delete(&product.id).await.unwrap());
        assert!(db.products().get_by_id(&product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_try_decrement_stock_is_guarded() {
        let db = setup().await;
        let product = kopi(3);
        db.products().insert(&product).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(ProductRepository::try_decrement_stock(&mut conn, &product.id, 2).await.unwrap());
        assert!(!ProductRepository::try_decrement_stock(&mut conn, &product.id, 2).await.unwrap());
        assert!(ProductRepository::try_decrement_stock(&mut conn, &product.id, 1).await.unwrap());
        drop(conn);

        let loaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(loaded.stock, 0);
    }

    #[tokio::test]
    async fn test_fetch_for_checkout_skips_inactive() {
        let db = setup().await;
        let mut product = kopi(3);
        db.products().insert(&product).await.unwrap();

        {
            let mut conn = db.pool().acquire().await.unwrap();
            let found = ProductRepository::fetch_for_checkout(&mut conn, &product.id)
                .await
                .unwrap();
            assert!(found.is_some());
        }

        product.is_active = false;
        db.products().update(&product).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let found = ProductRepository::fetch_for_checkout(&mut conn, &product.id)
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
