//! # Domain Types
//!
//! Records the checkout engine reads and writes.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │    Product      │   │  Transaction    │   │ TransactionItem │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  business_id    │   │  business_id    │   │  transaction_id │        │
//! │  │  price_cents    │   │  invoice_number │   │  product_id?    │        │
//! │  │  enable_stock   │   │  status         │   │  product_name   │        │
//! │  │  stock_qty?     │   │  total_cents    │   │  price_cents    │        │
//! │  │  is_active      │   │  expired_at     │   │  quantity       │        │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘        │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌───────────────────────────────────────┐        │
//! │  │    Category     │   │  TransactionStatus                    │        │
//! │  │  ─────────────  │   │  pending ──► paid                     │        │
//! │  │  business_id    │   │     │   ──► cancelled                 │        │
//! │  │  sort_order     │   │     └───► expired (detected lazily)   │        │
//! │  └─────────────────┘   └───────────────────────────────────────┘        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! `TransactionItem` copies the product name and price at checkout time, so
//! later catalog edits (or deletion, which nulls `product_id`) never rewrite
//! history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product a business sells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business (tenant) that owns this product.
    pub business_id: String,

    /// Display name, copied onto transaction items.
    pub name: String,

    /// Price in cents.
    pub price_cents: i64,

    /// Cost in cents (for margin reporting).
    pub cost_cents: Option<i64>,

    /// Whether stock_qty is tracked and enforced.
    pub enable_stock: bool,

    /// Units on hand. Only meaningful when `enable_stock` is true.
    pub stock_qty: Option<i64>,

    /// Inactive products cannot be sold.
    pub is_active: bool,

    pub category_id: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Units available for sale. A null stock column counts as zero.
    #[inline]
    pub fn available_stock(&self) -> i64 {
        self.stock_qty.unwrap_or(0)
    }

    /// Checks whether `quantity` units can be taken from stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        !self.enable_stock || self.available_stock() >= quantity
    }
}

// =============================================================================
// Transaction Status
// =============================================================================

/// Lifecycle state of a checkout transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Created, still editable and payable until `expired_at`.
    Pending,
    /// Cash received and change computed.
    Paid,
    /// Edit window passed without payment.
    Expired,
    /// Abandoned; stock was handed back.
    Cancelled,
}

impl TransactionStatus {
    /// Returns the lowercase name stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Paid => "paid",
            TransactionStatus::Expired => "expired",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal state.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Pending
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A checkout transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub business_id: String,
    /// User who rang up the checkout.
    pub created_by: String,
    /// `DDMMYY` + three uppercase letters, e.g. `190226QXR`.
    pub invoice_number: String,
    /// Σ item subtotals.
    pub total_cents: i64,
    pub received_cents: i64,
    /// received - total, never negative once paid.
    pub change_cents: i64,
    pub status: TransactionStatus,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub expired_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn received(&self) -> Money {
        Money::from_cents(self.received_cents)
    }

    #[inline]
    pub fn change(&self) -> Money {
        Money::from_cents(self.change_cents)
    }

    /// Expiry is strict: a transaction is still usable at exactly `expired_at`.
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expired_at
    }
}

// =============================================================================
// Transaction Item
// =============================================================================

/// A priced line inside a transaction.
/// Uses the snapshot pattern to freeze product data at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    /// Null once the product has been deleted.
    pub product_id: Option<String>,
    /// Product name at time of checkout (frozen).
    pub product_name: String,
    /// Unit price in cents at time of checkout (frozen).
    pub price_cents: i64,
    pub quantity: i64,
    /// price × quantity.
    pub subtotal_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A transaction together with its items, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionDetail {
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}

// =============================================================================
// Category
// =============================================================================

/// A product category with a per-business display position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub business_id: String,
    pub name: String,
    /// Unique within the business.
    pub sort_order: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Requests and Pages
// =============================================================================

/// One requested checkout line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

impl LineItemRequest {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        LineItemRequest {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total matching rows across all pages.
    pub total: i64,
    /// 1-based page number.
    pub page: i64,
    pub page_size: i64,
}

impl<T> Page<T> {
    /// Number of pages needed to show `total` rows.
    pub fn total_pages(&self) -> i64 {
        if self.page_size <= 0 {
            return 0;
        }
        (self.total + self.page_size - 1) / self.page_size
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn product(enable_stock: bool, stock_qty: Option<i64>) -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".to_string(),
            business_id: "b-1".to_string(),
            name: "Coffee".to_string(),
            price_cents: 1000,
            cost_cents: None,
            enable_stock,
            stock_qty,
            is_active: true,
            category_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_can_sell_respects_stock_flag() {
        assert!(product(false, None).can_sell(1_000));
        assert!(product(true, Some(5)).can_sell(5));
        assert!(!product(true, Some(5)).can_sell(6));
        assert!(!product(true, None).can_sell(1));
    }

    #[test]
    fn test_status_display_and_terminal() {
        assert_eq!(TransactionStatus::Cancelled.to_string(), "cancelled");
        assert_eq!(TransactionStatus::default(), TransactionStatus::Pending);
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Paid.is_terminal());
        assert!(TransactionStatus::Expired.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&TransactionStatus::Paid).unwrap();
        assert_eq!(json, "\"paid\"");
    }

    #[test]
    fn test_expiry_is_strictly_after() {
        let now = Utc::now();
        let tx = Transaction {
            id: "t-1".to_string(),
            business_id: "b-1".to_string(),
            created_by: "u-1".to_string(),
            invoice_number: "010126ABC".to_string(),
            total_cents: 0,
            received_cents: 0,
            change_cents: 0,
            status: TransactionStatus::Pending,
            paid_at: None,
            expired_at: now,
            created_at: now,
            updated_at: now,
        };
        assert!(!tx.is_expired_at(now));
        assert!(tx.is_expired_at(now + Duration::seconds(1)));
    }

    #[test]
    fn test_total_pages() {
        let page: Page<u8> = Page {
            items: vec![],
            total: 21,
            page: 1,
            page_size: 10,
        };
        assert_eq!(page.total_pages(), 3);
    }
}
