//! # Product Stock
//!
//! Stock effects of a checkout, applied on a unit of work's connection.
//!
//! ## Decrement Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  decrease(P, 3)                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE products SET stock_qty = stock_qty - 3                          │
//! │  WHERE id = P AND business_id = B AND enable_stock AND stock_qty >= 3   │
//! │       │                                                                 │
//! │       ├── 1 row  ──► Ok                                                 │
//! │       │                                                                 │
//! │       └── 0 rows ──► re-read P (same unit of work)                      │
//! │                        ├── gone              ──► ProductNotFound        │
//! │                        ├── no longer tracked ──► Ok (nothing to take)   │
//! │                        └── otherwise         ──► InsufficientStock      │
//! │                                                  (available, requested) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two checkouts racing for the last units serialize on the product row;
//! exactly one of them sees `stock_qty >= qty`. No application lock exists.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use qlaris_core::{CoreError, TransactionItem};
use qlaris_db::repository::product;

use crate::error::ServiceResult;

/// Stock operations for one business at one instant.
#[derive(Debug, Clone, Copy)]
pub struct ProductStock<'a> {
    business_id: &'a str,
    now: DateTime<Utc>,
}

impl<'a> ProductStock<'a> {
    pub fn new(business_id: &'a str, now: DateTime<Utc>) -> Self {
        ProductStock { business_id, now }
    }

    /// Takes `qty` units of a product, or fails naming the shortfall.
    pub async fn decrease(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        qty: i64,
    ) -> ServiceResult<()> {
        if product::decrease_stock(conn, self.business_id, product_id, qty, self.now).await? {
            return Ok(());
        }

        let current = product::find_by_id_and_business(conn, product_id, self.business_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        if !current.enable_stock {
            debug!(product_id = %product_id, "Product no longer tracks stock");
            return Ok(());
        }

        let available = current.available_stock();
        warn!(
            product_id = %product_id,
            available,
            requested = qty,
            "Stock decrement rejected"
        );

        Err(CoreError::InsufficientStock {
            product_id: current.id,
            name: current.name,
            available,
            requested: qty,
        }
        .into())
    }

    /// Returns `qty` units to a stock-managed product.
    pub async fn increase(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        qty: i64,
    ) -> ServiceResult<()> {
        product::increase_stock(conn, self.business_id, product_id, qty, self.now).await?;
        Ok(())
    }

    /// Applies a priced cart's demand, stopping at the first shortfall.
    /// The caller's unit of work rolls back what was already taken.
    pub async fn take(
        &self,
        conn: &mut SqliteConnection,
        demand: &[(String, i64)],
    ) -> ServiceResult<()> {
        for (product_id, qty) in demand {
            self.decrease(conn, product_id, *qty).await?;
        }
        Ok(())
    }

    /// Gives back the stock held by stored items.
    ///
    /// Items whose product was deleted, moved out of the business, or
    /// stopped tracking stock are skipped.
    ///
    /// ## Returns
    /// Number of products whose stock changed.
    pub async fn restore(
        &self,
        conn: &mut SqliteConnection,
        items: &[TransactionItem],
    ) -> ServiceResult<usize> {
        let ids: Vec<String> = items.iter().filter_map(|i| i.product_id.clone()).collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let tracked: HashSet<String> = product::find_by_ids(conn, &ids)
            .await?
            .into_iter()
            .filter(|p| p.business_id == self.business_id && p.enable_stock)
            .map(|p| p.id)
            .collect();

        let mut returns: Vec<(&str, i64)> = Vec::new();
        for item in items {
            let Some(product_id) = item.product_id.as_deref() else {
                continue;
            };
            if !tracked.contains(product_id) {
                continue;
            }
            match returns.iter_mut().find(|(id, _)| *id == product_id) {
                Some((_, qty)) => *qty += item.quantity,
                None => returns.push((product_id, item.quantity)),
            }
        }

        for (product_id, qty) in &returns {
            self.increase(conn, product_id, *qty).await?;
        }

        debug!(products = returns.len(), "Stock restored");
        Ok(returns.len())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
