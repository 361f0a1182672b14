//! # Dashboard Repository
//!
//! Aggregate queries over paid transactions.
//!
//! ```text
//! transactions (paid, business, [start, end))
//!      │
//!      ├── Σ total_cents                        ──► sales_cents
//!      ├── COUNT(*)                             ──► transactions
//!      └── Σ total_cents - Σ cost_cents × qty   ──► profit_cents
//!              (items whose product is gone cost nothing)
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use qlaris_core::{PeriodStats, ProductSales};

/// Repository for dashboard figures.
#[derive(Debug, Clone)]
pub struct DashboardRepository {
    pool: SqlitePool,
}

impl DashboardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DashboardRepository { pool }
    }

    /// Sales, count and profit of the business's paid transactions created
    /// in `[start, end)`.
    pub async fn period_stats(
        &self,
        business_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<PeriodStats> {
        debug!(business_id = %business_id, %start, %end, "Computing period stats");

        let stats = sqlx::query_as::<_, PeriodStats>(
            r#"
            WITH paid AS (
                SELECT id, total_cents
                FROM transactions
                WHERE business_id = ?1
                  AND status = 'paid'
                  AND created_at >= ?2
                  AND created_at < ?3
            ),
            cost AS (
                SELECT ti.transaction_id,
                       SUM(COALESCE(p.cost_cents, 0) * ti.quantity) AS cost_cents
                FROM transaction_items ti
                JOIN paid ON paid.id = ti.transaction_id
                JOIN products p ON p.id = ti.product_id AND p.business_id = ?1
                GROUP BY ti.transaction_id
            )
            SELECT
                COALESCE(SUM(paid.total_cents), 0) AS sales_cents,
                COUNT(*) AS transactions,
                COALESCE(SUM(paid.total_cents - COALESCE(cost.cost_cents, 0)), 0) AS profit_cents
            FROM paid
            LEFT JOIN cost ON cost.transaction_id = paid.id
            "#,
        )
        .bind(business_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    /// Products with the most units sold across paid transactions.
    ///
    /// Deleted products drop out; ties go to the name that sorts first.
    pub async fn top_products(&self, business_id: &str, limit: i64) -> DbResult<Vec<ProductSales>> {
        let products = sqlx::query_as::<_, ProductSales>(
            r#"
            SELECT
                p.id AS product_id,
                p.name AS product_name,
                SUM(ti.quantity) AS quantity_sold,
                SUM(ti.subtotal_cents) AS sales_cents
            FROM transaction_items ti
            JOIN transactions t ON t.id = ti.transaction_id
            JOIN products p ON p.id = ti.product_id AND p.business_id = t.business_id
            WHERE t.business_id = ?1
              AND t.status = 'paid'
            GROUP BY p.id, p.name
            ORDER BY quantity_sold DESC, p.name
            LIMIT ?2
            "#,
        )
        .bind(business_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{product, transaction};
    use crate::{Database, DbConfig};
    use chrono::{Duration, TimeZone};
    use qlaris_core::{Product, Transaction, TransactionItem, TransactionStatus};

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 19, h, 0, 0).unwrap()
    }

    async fn add_product(db: &Database, business_id: &str, name: &str, cost: Option<i64>) -> Product {
        let now = at(0);
        let p = Product {
            id: product::generate_product_id(),
            business_id: business_id.to_string(),
            name: name.to_string(),
            price_cents: 1000,
            cost_cents: cost,
            enable_stock: false,
            stock_qty: None,
            is_active: true,
            category_id: None,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&p).await.unwrap()
    }

    async fn sell(
        db: &Database,
        business_id: &str,
        status: TransactionStatus,
        created_at: DateTime<Utc>,
        lines: &[(&Product, i64)],
    ) -> Transaction {
        let id = transaction::generate_transaction_id();
        let items: Vec<TransactionItem> = lines
            .iter()
            .map(|(p, qty)| TransactionItem {
                id: transaction::generate_item_id(),
                transaction_id: id.clone(),
                product_id: Some(p.id.clone()),
                product_name: p.name.clone(),
                price_cents: p.price_cents,
                quantity: *qty,
                subtotal_cents: p.price_cents * qty,
                created_at,
            })
            .collect();
        let total_cents = items.iter().map(|i| i.subtotal_cents).sum();

        let tx = Transaction {
            id,
            business_id: business_id.to_string(),
            created_by: "u-1".to_string(),
            invoice_number: format!("INV-{}", created_at.timestamp()),
            total_cents,
            received_cents: total_cents,
            change_cents: 0,
            status,
            paid_at: (status == TransactionStatus::Paid).then_some(created_at),
            expired_at: created_at + Duration::minutes(15),
            created_at,
            updated_at: created_at,
        };

        let mut uow = db.begin().await.unwrap();
        transaction::insert(uow.conn(), &tx).await.unwrap();
        transaction::insert_items(uow.conn(), &items).await.unwrap();
        uow.commit().await.unwrap();
        tx
    }

    #[tokio::test]
    async fn test_period_stats_counts_paid_in_range() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coffee = add_product(&db, "b-1", "Coffee", Some(600)).await;
        let gift = add_product(&db, "b-1", "Gift Card", None).await;

        sell(&db, "b-1", TransactionStatus::Paid, at(9), &[(&coffee, 2)]).await;
        sell(&db, "b-1", TransactionStatus::Paid, at(10), &[(&coffee, 1), (&gift, 1)]).await;
        // Not counted: pending, other business, outside the range
        sell(&db, "b-1", TransactionStatus::Pending, at(11), &[(&coffee, 5)]).await;
        sell(&db, "b-2", TransactionStatus::Paid, at(11), &[(&coffee, 5)]).await;
        sell(&db, "b-1", TransactionStatus::Paid, at(12), &[(&coffee, 5)]).await;

        let stats = db
            .dashboard()
            .period_stats("b-1", at(9), at(12))
            .await
            .unwrap();

        assert_eq!(stats.transactions, 2);
        assert_eq!(stats.sales_cents, 4000);
        // 4000 - 3 coffees at 600; the gift card has no cost
        assert_eq!(stats.profit_cents, 2200);
    }

    #[tokio::test]
    async fn test_period_stats_empty_and_deleted_products() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.dashboard();

        let empty = repo.period_stats("b-1", at(0), at(23)).await.unwrap();
        assert_eq!(empty, PeriodStats::default());

        let coffee = add_product(&db, "b-1", "Coffee", Some(600)).await;
        sell(&db, "b-1", TransactionStatus::Paid, at(9), &[(&coffee, 1)]).await;
        db.products().delete(&coffee.id, "b-1").await.unwrap();

        let stats = repo.period_stats("b-1", at(0), at(23)).await.unwrap();
        assert_eq!(stats.sales_cents, 1000);
        assert_eq!(stats.profit_cents, 1000);
    }

    #[tokio::test]
    async fn test_top_products() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coffee = add_product(&db, "b-1", "Coffee", None).await;
        let tea = add_product(&db, "b-1", "Tea", None).await;
        let cake = add_product(&db, "b-1", "Cake", None).await;

        sell(&db, "b-1", TransactionStatus::Paid, at(9), &[(&tea, 1), (&coffee, 2)]).await;
        sell(&db, "b-1", TransactionStatus::Paid, at(10), &[(&tea, 3), (&cake, 2)]).await;
        sell(&db, "b-1", TransactionStatus::Cancelled, at(11), &[(&cake, 9)]).await;

        let top = db
            .dashboard()
            .top_products("b-1", 2)
            .await
            .unwrap();

        let names: Vec<_> = top.iter().map(|p| (p.product_name.as_str(), p.quantity_sold)).collect();
        assert_eq!(names, vec![("Tea", 4), ("Cake", 2)]);
        assert_eq!(top[0].sales_cents, 4000);
    }
}
