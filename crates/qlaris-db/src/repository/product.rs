//! # Product Repository
//!
//! Catalog reads and the two stock primitives the checkout engine relies on.
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Why One Statement                                    │
//! │                                                                         │
//! │  ❌ WRONG: read-modify-write                                             │
//! │     SELECT stock_qty → 5                                                │
//! │     (another checkout takes 5)                                          │
//! │     UPDATE products SET stock_qty = 5 - 3  → stock is now wrong         │
//! │                                                                         │
//! │  ✅ CORRECT: compare-and-subtract in SQLite                              │
//! │     UPDATE products SET stock_qty = stock_qty - 3                       │
//! │     WHERE id = ? AND stock_qty >= 3                                     │
//! │                                                                         │
//! │     1 row  → reserved                                                   │
//! │     0 rows → insufficient (or lost the race); caller rolls back         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Functions that take `&mut SqliteConnection` run inside a caller's unit
//! of work. `ProductRepository` methods run on the pool.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::{contains_pattern, page_offset};
use crate::error::{DbError, DbResult};
use qlaris_core::Product;

const PRODUCT_COLUMNS: &str = "id, business_id, name, price_cents, cost_cents, enable_stock, \
     stock_qty, is_active, category_id, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let page = repo.list_by_business(&business_id, Some("cof"), 1, 20).await?;
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

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The product as stored
    /// * `Err(DbError::UniqueViolation)` - id already exists
    /// * `Err(DbError::CheckViolation)` - negative price or stock
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, business_id = %product.business_id, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, business_id, name, price_cents, cost_cents,
                enable_stock, stock_qty, is_active, category_id,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.business_id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.enable_stock)
        .bind(product.stock_qty)
        .bind(product.is_active)
        .bind(&product.category_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Gets a product scoped to its business.
    pub async fn get_by_id_and_business(
        &self,
        id: &str,
        business_id: &str,
    ) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        find_by_id_and_business(&mut conn, id, business_id).await
    }

    /// Gets every product whose id is in `ids`, regardless of business.
    ///
    /// ## Why Unscoped?
    /// Pricing needs to tell "doesn't exist" apart from "belongs to someone
    /// else" so it can report the right reason.
    pub async fn get_by_ids(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        find_by_ids(&mut conn, ids).await
    }

    /// Lists a business's products, newest first, optionally filtered by a
    /// case-insensitive name substring.
    ///
    /// ## Returns
    /// `(products on this page, total matching)`
    pub async fn list_by_business(
        &self,
        business_id: &str,
        search: Option<&str>,
        page: i64,
        page_size: i64,
    ) -> DbResult<(Vec<Product>, i64)> {
        debug!(business_id = %business_id, ?search, page, page_size, "Listing products");
        let pattern = search.map(contains_pattern);

        let sql = format!(
            r#"
            SELECT {}
            FROM products
            WHERE business_id = ?1
              AND (?2 IS NULL OR name LIKE ?2 ESCAPE '\')
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?3 OFFSET ?4
            "#,
            PRODUCT_COLUMNS
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(business_id)
            .bind(pattern.as_deref())
            .bind(page_size)
            .bind(page_offset(page, page_size))
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM products
            WHERE business_id = ?1
              AND (?2 IS NULL OR name LIKE ?2 ESCAPE '\')
            "#,
        )
        .bind(business_id)
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok((products, total))
    }

    /// Activates or deactivates a product.
    ///
    /// ## Why Not Delete?
    /// Inactive products stay visible on historical transactions with a
    /// live `product_id`, and can be re-enabled.
    pub async fn set_active(&self, id: &str, business_id: &str, is_active: bool) -> DbResult<()> {
        debug!(id = %id, is_active, "Setting product active flag");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET is_active = ?3, updated_at = ?4
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Deletes a product. Transaction items referencing it keep their
    /// snapshot and have `product_id` set to NULL.
    pub async fn delete(&self, id: &str, business_id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1 AND business_id = ?2")
            .bind(id)
            .bind(business_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts a business's products (for diagnostics and the seed tool).
    pub async fn count_by_business(&self, business_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE business_id = ?1")
            .bind(business_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit-of-Work Functions
// =============================================================================

/// Gets a product scoped to its business on the given connection.
pub async fn find_by_id_and_business(
    conn: &mut SqliteConnection,
    id: &str,
    business_id: &str,
) -> DbResult<Option<Product>> {
    let sql = format!(
        "SELECT {} FROM products WHERE id = ?1 AND business_id = ?2",
        PRODUCT_COLUMNS
    );

    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(business_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}

/// Gets every product whose id is in `ids` on the given connection.
/// Duplicate ids are fine; each product is returned once.
pub async fn find_by_ids(conn: &mut SqliteConnection, ids: &[String]) -> DbResult<Vec<Product>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM products WHERE id IN (", PRODUCT_COLUMNS));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id.as_str());
    }
    separated.push_unseparated(")");

    let products = query
        .build_query_as::<Product>()
        .fetch_all(&mut *conn)
        .await?;

    debug!(requested = ids.len(), found = products.len(), "Fetched products by id");
    Ok(products)
}

/// Takes `qty` units from a stock-managed product if, and only if, at
/// least `qty` are on hand.
///
/// ## Returns
/// * `Ok(true)` - Stock decremented
/// * `Ok(false)` - Not enough stock, product missing, foreign, or not
///   stock-managed. Nothing changed.
pub async fn decrease_stock(
    conn: &mut SqliteConnection,
    business_id: &str,
    product_id: &str,
    qty: i64,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    debug!(product_id = %product_id, qty, "Decreasing stock");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_qty = stock_qty - ?1, updated_at = ?4
        WHERE id = ?2
          AND business_id = ?3
          AND enable_stock = 1
          AND stock_qty >= ?1
        "#,
    )
    .bind(qty)
    .bind(product_id)
    .bind(business_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Returns `qty` units to a stock-managed product. No precondition.
///
/// ## Errors
/// * `DbError::NotFound` - no stock-managed product with this id in
///   the business
pub async fn increase_stock(
    conn: &mut SqliteConnection,
    business_id: &str,
    product_id: &str,
    qty: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(product_id = %product_id, qty, "Increasing stock");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_qty = COALESCE(stock_qty, 0) + ?1, updated_at = ?4
        WHERE id = ?2
          AND business_id = ?3
          AND enable_stock = 1
        "#,
    )
    .bind(qty)
    .bind(product_id)
    .bind(business_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", product_id));
    }

    Ok(())
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
