//! # Category Repository
//!
//! Category storage and the primitives behind bulk reordering.
//!
//! ## Reorder Without Collisions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UNIQUE(business_id, sort_order)                                        │
//! │                                                                         │
//! │               A    B    C                                               │
//! │  committed    0    1    2                                               │
//! │                                                                         │
//! │  lock_business()         no-op UPDATE, takes the write lock             │
//! │  shift_to_negative()    -1   -2   -3     -1 - n is injective and        │
//! │                                          never meets a value >= 0       │
//! │  apply_sort_orders()     1    2    0     one CASE statement             │
//! │                                                                         │
//! │  Readers outside the unit of work only ever see the first or the        │
//! │  last row.                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use qlaris_core::Category;

const CATEGORY_COLUMNS: &str = "id, business_id, name, sort_order, created_at, updated_at";

/// Repository for category operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Creates a category at the end of the business's ordering.
    ///
    /// The position is computed inside the INSERT itself, so two concurrent
    /// creates can't pick the same sort_order. The first category of a
    /// business gets 1.
    pub async fn create(
        &self,
        business_id: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Category> {
        let id = generate_category_id();
        debug!(id = %id, business_id = %business_id, name = %name, "Creating category");

        sqlx::query(
            r#"
            INSERT INTO categories (id, business_id, name, sort_order, created_at, updated_at)
            SELECT ?1, ?2, ?3, COALESCE(MAX(sort_order), 0) + 1, ?4, ?4
            FROM categories
            WHERE business_id = ?2
            "#,
        )
        .bind(&id)
        .bind(business_id)
        .bind(name)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_id_and_business(&id, business_id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", &id))
    }

    /// Gets a category scoped to the business.
    pub async fn get_by_id_and_business(
        &self,
        id: &str,
        business_id: &str,
    ) -> DbResult<Option<Category>> {
        let sql = format!(
            "SELECT {} FROM categories WHERE id = ?1 AND business_id = ?2",
            CATEGORY_COLUMNS
        );

        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .bind(business_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    /// Lists a business's categories by sort_order.
    pub async fn list_by_business(&self, business_id: &str) -> DbResult<Vec<Category>> {
        let mut conn = self.pool.acquire().await?;
        list_in(&mut conn, business_id).await
    }

    /// Renames a category. Its position is unchanged.
    pub async fn rename(
        &self,
        id: &str,
        business_id: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Category> {
        debug!(id = %id, name = %name, "Renaming category");

        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = ?3, updated_at = ?4
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(name)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        self.get_by_id_and_business(id, business_id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Deletes a category. Its products become uncategorized; the other
    /// categories keep their sort_order, gap included.
    pub async fn delete(&self, id: &str, business_id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting category");

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1 AND business_id = ?2")
            .bind(id)
            .bind(business_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit-of-Work Functions
// =============================================================================

/// Takes the write lock for a reorder before anything is read.
///
/// SQLite has no `SELECT ... FOR UPDATE`. A write that changes nothing
/// still takes the database write lock, so concurrent reorders queue behind
/// this unit of work.
///
/// ## Returns
/// Number of categories the business has.
pub async fn lock_business(conn: &mut SqliteConnection, business_id: &str) -> DbResult<u64> {
    let result =
        sqlx::query("UPDATE categories SET updated_at = updated_at WHERE business_id = ?1")
            .bind(business_id)
            .execute(&mut *conn)
            .await?;

    Ok(result.rows_affected())
}

/// Lists a business's categories by sort_order on the given connection.
pub async fn list_in(conn: &mut SqliteConnection, business_id: &str) -> DbResult<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories WHERE business_id = ?1 ORDER BY sort_order",
        CATEGORY_COLUMNS
    );

    let categories = sqlx::query_as::<_, Category>(&sql)
        .bind(business_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(categories)
}

/// Mirrors every sort_order of the business into the negative range.
///
/// Committed values are never negative, so `-1 - n` maps them onto distinct
/// values that can't meet any row not yet moved.
pub async fn shift_to_negative(conn: &mut SqliteConnection, business_id: &str) -> DbResult<u64> {
    let result = sqlx::query(
        "UPDATE categories SET sort_order = -1 - sort_order WHERE business_id = ?1",
    )
    .bind(business_id)
    .execute(&mut *conn)
    .await?;

    debug!(business_id = %business_id, rows = result.rows_affected(), "Shifted sort orders");
    Ok(result.rows_affected())
}

/// Writes the final sort_order of every listed category in one statement.
///
/// ```sql
/// UPDATE categories
/// SET sort_order = CASE id WHEN ? THEN ? WHEN ? THEN ? ... END,
///     updated_at = ?
/// WHERE business_id = ? AND id IN (?, ?, ...)
/// ```
pub async fn apply_sort_orders(
    conn: &mut SqliteConnection,
    business_id: &str,
    orders: &[(String, i64)],
    now: DateTime<Utc>,
) -> DbResult<u64> {
    if orders.is_empty() {
        return Ok(0);
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("UPDATE categories SET sort_order = CASE id");
    for (id, sort_order) in orders {
        query.push(" WHEN ");
        query.push_bind(id.as_str());
        query.push(" THEN ");
        query.push_bind(*sort_order);
    }
    query.push(" END, updated_at = ");
    query.push_bind(now);
    query.push(" WHERE business_id = ");
    query.push_bind(business_id);
    query.push(" AND id IN (");
    let mut separated = query.separated(", ");
    for (id, _) in orders {
        separated.push_bind(id.as_str());
    }
    separated.push_unseparated(")");

    let result = query.build().execute(&mut *conn).await?;

    debug!(business_id = %business_id, rows = result.rows_affected(), "Applied sort orders");
    Ok(result.rows_affected())
}

/// Generates a new category ID.
pub fn generate_category_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
