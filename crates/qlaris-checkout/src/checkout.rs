//! # Checkout Service
//!
//! The transaction lifecycle: create, edit, pay and cancel a checkout while
//! keeping product stock consistent.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Transaction Lifecycle                                │
//! │                                                                         │
//! │              create (no cash)                                           │
//! │                    │                                                    │
//! │                    ▼          update (items replaced, stock re-applied) │
//! │  create ──►  ┌──────────┐ ◄──────────────┐                              │
//! │  (cash)      │ PENDING  │ ───────────────┘                              │
//! │    │         └────┬─────┘                                               │
//! │    │     pay /    │    cancel          now > expired_at                 │
//! │    │  update(cash)│  (stock back)    (detected, never written)          │
//! │    ▼              ▼        │                  │                         │
//! │  ┌──────┐    ┌──────┐   ┌──────────┐     ┌─────────┐                    │
//! │  │ PAID │ ◄──┘      │   │CANCELLED │     │ EXPIRED │                    │
//! │  └──────┘           │   └──────────┘     └─────────┘                    │
//! │                                                                         │
//! │  PAID, CANCELLED and EXPIRED are terminal.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Unit of Work per Operation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create  price (pooled read) ─► BEGIN ─► insert tx ─► insert items      │
//! │          ─► take stock ─► COMMIT                                        │
//! │                                                                         │
//! │  update  BEGIN ─► claim ─► guards ─► restore old stock ─► re-read       │
//! │          products ─► price ─► take stock ─► replace items ─► save       │
//! │          ─► COMMIT                                                      │
//! │                                                                         │
//! │  pay     BEGIN ─► claim ─► guards ─► settle cash ─► save ─► COMMIT      │
//! │  cancel  BEGIN ─► claim ─► guards ─► restore stock ─► save ─► COMMIT    │
//! │                                                                         │
//! │  Any error drops the unit of work, which rolls everything back.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Update re-prices against stock after the old items were given back, so a
//! cart that holds 3 of the last 5 units can grow to 5.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};
use ts_rs::TS;

use qlaris_core::validation::{
    validate_line_items, validate_pagination, validate_received_cents, validate_search_query,
};
use qlaris_core::{
    settle_cash, AccessPolicy, Clock, CoreError, InvoiceNumberGenerator, LineItemRequest, Money,
    Page, Permission, PricedCart, PricingCalculator, Principal, Product, RandomInvoiceNumbers,
    SystemClock, Transaction, TransactionDetail, TransactionItem, TransactionStatus,
};
use qlaris_db::repository::{product, transaction as transaction_repo};
use qlaris_db::Database;

use crate::config::CheckoutConfig;
use crate::error::ServiceResult;
use crate::stock::ProductStock;

// =============================================================================
// Requests
// =============================================================================

/// Lines to check out, optionally paid in cash on the spot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<LineItemRequest>,

    /// Cash handed over, in cents. `None` leaves the transaction pending.
    #[serde(default)]
    pub received_cents: Option<i64>,
}

impl CheckoutRequest {
    pub fn new(items: Vec<LineItemRequest>) -> Self {
        CheckoutRequest {
            items,
            received_cents: None,
        }
    }

    pub fn paid_with(mut self, received_cents: i64) -> Self {
        self.received_cents = Some(received_cents);
        self
    }
}

/// Listing parameters. Missing values fall back to page 1 and the
/// configured page size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    /// Case-insensitive substring of the invoice number.
    #[serde(default)]
    pub search: Option<String>,
}

// =============================================================================
// Checkout Service
// =============================================================================

/// Transaction lifecycle service.
///
/// Cheap to clone; clones share the pool, clock and policy.
#[derive(Clone)]
pub struct CheckoutService {
    db: Database,
    clock: Arc<dyn Clock>,
    invoices: Arc<dyn InvoiceNumberGenerator>,
    policy: Arc<AccessPolicy>,
    ttl: Duration,
    default_page_size: i64,
}

impl CheckoutService {
    /// Creates a service with the wall clock, random invoice numbers and
    /// the standard access policy.
    pub fn new(db: Database, config: &CheckoutConfig) -> Self {
        CheckoutService {
            db,
            clock: Arc::new(SystemClock),
            invoices: Arc::new(RandomInvoiceNumbers),
            policy: Arc::new(AccessPolicy::standard()),
            ttl: config.transaction_ttl(),
            default_page_size: config.default_page_size,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_invoice_numbers(mut self, invoices: Arc<dyn InvoiceNumberGenerator>) -> Self {
        self.invoices = invoices;
        self
    }

    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Checks that `principal` holds one of `required` for `business_id`.
    ///
    /// Called by the HTTP layer before dispatching to an operation.
    pub fn authorize(
        &self,
        principal: &Principal,
        required: &[Permission],
        business_id: &str,
    ) -> ServiceResult<Permission> {
        self.policy
            .authorize(principal, required, business_id)
            .map_err(|e| {
                warn!(user_id = %principal.user_id, business_id = %business_id, "Access denied");
                e.into()
            })
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Creates a transaction from a cart and takes its stock.
    ///
    /// With `received_cents` the transaction is stored as paid right away;
    /// otherwise it stays pending until `now + ttl`.
    ///
    /// ## Errors
    /// * Validation - empty cart, bad quantity, bad product id, negative cash
    /// * `ProductNotFound` / `ProductInactive` / `ProductNotOwned`
    /// * `InsufficientStock` - from pricing, or from losing a race for stock
    /// * `InsufficientPayment` - cash below the total
    pub async fn create_transaction(
        &self,
        business_id: &str,
        user_id: &str,
        request: CheckoutRequest,
    ) -> ServiceResult<TransactionDetail> {
        validate_line_items(&request.items)?;
        if let Some(received) = request.received_cents {
            validate_received_cents(received)?;
        }

        let now = self.clock.now();

        let products = self.load_products(&request.items).await?;
        let cart = PricingCalculator::new(business_id).price(&request.items, &products)?;
        let settlement = request
            .received_cents
            .map(|received| settle_cash(cart.total, Money::from_cents(received)))
            .transpose()?;

        let mut transaction = Transaction {
            id: transaction_repo::generate_transaction_id(),
            business_id: business_id.to_string(),
            created_by: user_id.to_string(),
            invoice_number: self.invoices.generate(now),
            total_cents: cart.total.cents(),
            received_cents: 0,
            change_cents: 0,
            status: TransactionStatus::Pending,
            paid_at: None,
            expired_at: now + self.ttl,
            created_at: now,
            updated_at: now,
        };
        if let Some(settlement) = settlement {
            transaction.received_cents = settlement.received.cents();
            transaction.change_cents = settlement.change.cents();
            transaction.status = TransactionStatus::Paid;
            transaction.paid_at = Some(now);
        }
        let items = build_items(&transaction.id, &cart, now);

        let mut uow = self.db.begin().await?;
        transaction_repo::insert(uow.conn(), &transaction).await?;
        transaction_repo::insert_items(uow.conn(), &items).await?;
        ProductStock::new(business_id, now)
            .take(uow.conn(), &cart.stock_demand())
            .await?;
        uow.commit().await?;

        info!(
            id = %transaction.id,
            invoice_number = %transaction.invoice_number,
            status = %transaction.status,
            total = %cart.total,
            lines = items.len(),
            "Transaction created"
        );

        Ok(TransactionDetail { transaction, items })
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Replaces the items of a pending transaction.
    ///
    /// Old stock is given back and new stock taken in the same unit of work;
    /// a rejected update leaves both stock and items exactly as they were.
    pub async fn update_transaction(
        &self,
        transaction_id: &str,
        business_id: &str,
        request: CheckoutRequest,
    ) -> ServiceResult<TransactionDetail> {
        validate_line_items(&request.items)?;
        if let Some(received) = request.received_cents {
            validate_received_cents(received)?;
        }

        let now = self.clock.now();
        let stock = ProductStock::new(business_id, now);

        let mut uow = self.db.begin().await?;
        let mut transaction = claim_pending(uow.conn(), transaction_id, business_id, now).await?;

        let old_items = transaction_repo::find_items(uow.conn(), transaction_id).await?;
        stock.restore(uow.conn(), &old_items).await?;

        // Snapshot after the restore, so the old quantities count as available
        let ids: Vec<String> = request.items.iter().map(|l| l.product_id.clone()).collect();
        let products = by_id(product::find_by_ids(uow.conn(), &ids).await?);
        let cart = PricingCalculator::new(business_id).price(&request.items, &products)?;
        let settlement = request
            .received_cents
            .map(|received| settle_cash(cart.total, Money::from_cents(received)))
            .transpose()?;

        stock.take(uow.conn(), &cart.stock_demand()).await?;

        transaction_repo::delete_items(uow.conn(), transaction_id).await?;
        let items = build_items(transaction_id, &cart, now);
        transaction_repo::insert_items(uow.conn(), &items).await?;

        transaction.total_cents = cart.total.cents();
        if let Some(settlement) = settlement {
            transaction.received_cents = settlement.received.cents();
            transaction.change_cents = settlement.change.cents();
            transaction.status = TransactionStatus::Paid;
            transaction.paid_at = Some(now);
        }
        save(uow.conn(), &mut transaction, now).await?;
        uow.commit().await?;

        info!(
            id = %transaction.id,
            status = %transaction.status,
            total = %cart.total,
            old_lines = old_items.len(),
            new_lines = items.len(),
            "Transaction updated"
        );

        Ok(TransactionDetail { transaction, items })
    }

    // =========================================================================
    // Pay
    // =========================================================================

    /// Pays a pending transaction in cash. No stock effect.
    pub async fn pay_transaction(
        &self,
        transaction_id: &str,
        business_id: &str,
        received_cents: i64,
    ) -> ServiceResult<TransactionDetail> {
        validate_received_cents(received_cents)?;

        let now = self.clock.now();

        let mut uow = self.db.begin().await?;
        let mut transaction = claim_pending(uow.conn(), transaction_id, business_id, now).await?;

        let settlement = settle_cash(transaction.total(), Money::from_cents(received_cents))?;
        transaction.received_cents = settlement.received.cents();
        transaction.change_cents = settlement.change.cents();
        transaction.status = TransactionStatus::Paid;
        transaction.paid_at = Some(now);
        save(uow.conn(), &mut transaction, now).await?;

        let items = transaction_repo::find_items(uow.conn(), transaction_id).await?;
        uow.commit().await?;

        info!(
            id = %transaction.id,
            total = %transaction.total(),
            received = %transaction.received(),
            change = %transaction.change(),
            "Transaction paid"
        );

        Ok(TransactionDetail { transaction, items })
    }

    // =========================================================================
    // Cancel
    // =========================================================================

    /// Cancels a pending transaction and gives its stock back.
    pub async fn cancel_transaction(
        &self,
        transaction_id: &str,
        business_id: &str,
    ) -> ServiceResult<TransactionDetail> {
        let now = self.clock.now();

        let mut uow = self.db.begin().await?;
        let mut transaction = claim_pending(uow.conn(), transaction_id, business_id, now).await?;

        let items = transaction_repo::find_items(uow.conn(), transaction_id).await?;
        let restored = ProductStock::new(business_id, now)
            .restore(uow.conn(), &items)
            .await?;

        transaction.status = TransactionStatus::Cancelled;
        save(uow.conn(), &mut transaction, now).await?;
        uow.commit().await?;

        info!(id = %transaction.id, restored, "Transaction cancelled");

        Ok(TransactionDetail { transaction, items })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a transaction with its items.
    ///
    /// Expiry isn't evaluated here: an expired transaction still reads as
    /// pending until someone tries to change it.
    pub async fn get_transaction(
        &self,
        transaction_id: &str,
        business_id: &str,
    ) -> ServiceResult<TransactionDetail> {
        let detail = self
            .db
            .transactions()
            .get_by_id_and_business(transaction_id, business_id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;

        Ok(detail)
    }

    /// Lists a business's transactions, newest first.
    pub async fn list_transactions(
        &self,
        business_id: &str,
        query: ListQuery,
    ) -> ServiceResult<Page<TransactionDetail>> {
        let page = query.page.unwrap_or(1);
        let page_size = query.page_size.unwrap_or(self.default_page_size);
        validate_pagination(page, page_size)?;
        let search = validate_search_query(query.search.as_deref())?;

        let (items, total) = self
            .db
            .transactions()
            .list_by_business(business_id, search.as_deref(), page, page_size)
            .await?;

        debug!(business_id = %business_id, page, page_size, total, "Listed transactions");

        Ok(Page {
            items,
            total,
            page,
            page_size,
        })
    }

    async fn load_products(&self, lines: &[LineItemRequest]) -> ServiceResult<HashMap<String, Product>> {
        let ids: Vec<String> = lines.iter().map(|l| l.product_id.clone()).collect();
        Ok(by_id(self.db.products().get_by_ids(&ids).await?))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Locks a transaction row and checks it can still change.
///
/// Guard order: missing → `TransactionNotFound`, not pending →
/// `InvalidTransactionStatus`, past `expired_at` → `TransactionExpired`.
async fn claim_pending(
    conn: &mut SqliteConnection,
    transaction_id: &str,
    business_id: &str,
    now: DateTime<Utc>,
) -> ServiceResult<Transaction> {
    let not_found = || CoreError::TransactionNotFound(transaction_id.to_string());

    if !transaction_repo::claim(conn, transaction_id, business_id).await? {
        return Err(not_found().into());
    }

    let transaction = transaction_repo::find(conn, transaction_id, business_id)
        .await?
        .ok_or_else(not_found)?;

    if transaction.status.is_terminal() {
        warn!(id = %transaction_id, status = %transaction.status, "Transaction is not pending");
        return Err(CoreError::InvalidTransactionStatus {
            transaction_id: transaction_id.to_string(),
            current_status: transaction.status,
        }
        .into());
    }

    if transaction.is_expired_at(now) {
        warn!(id = %transaction_id, expired_at = %transaction.expired_at, "Transaction expired");
        return Err(CoreError::TransactionExpired {
            transaction_id: transaction_id.to_string(),
            expired_at: transaction.expired_at,
        }
        .into());
    }

    Ok(transaction)
}

/// Writes a claimed transaction back. The row is locked by this unit of
/// work, so losing the `status = 'pending'` guard here means it changed
/// under us.
async fn save(
    conn: &mut SqliteConnection,
    transaction: &mut Transaction,
    now: DateTime<Utc>,
) -> ServiceResult<()> {
    if !transaction_repo::save_pending(conn, transaction, now).await? {
        let current = transaction_repo::find(conn, &transaction.id, &transaction.business_id)
            .await?
            .map(|t| t.status)
            .unwrap_or(transaction.status);
        return Err(CoreError::InvalidTransactionStatus {
            transaction_id: transaction.id.clone(),
            current_status: current,
        }
        .into());
    }

    transaction.updated_at = now;
    Ok(())
}

fn by_id(products: Vec<Product>) -> HashMap<String, Product> {
    products.into_iter().map(|p| (p.id.clone(), p)).collect()
}

/// Snapshots priced lines into stored items.
fn build_items(transaction_id: &str, cart: &PricedCart, now: DateTime<Utc>) -> Vec<TransactionItem> {
    cart.lines
        .iter()
        .map(|line| TransactionItem {
            id: transaction_repo::generate_item_id(),
            transaction_id: transaction_id.to_string(),
            product_id: Some(line.product_id.clone()),
            product_name: line.product_name.clone(),
            price_cents: line.unit_price.cents(),
            quantity: line.quantity,
            subtotal_cents: line.subtotal.cents(),
            created_at: now,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, ServiceError};
    use chrono::TimeZone;
    use qlaris_core::{Action, ManualClock, Role};
    use qlaris_db::DbConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BUSINESS: &str = "b-1";
    const OTHER_BUSINESS: &str = "b-2";
    const CASHIER: &str = "u-1";

    /// Invoice numbers INV-0001, INV-0002, ...
    struct SequentialInvoices(AtomicUsize);

    impl InvoiceNumberGenerator for SequentialInvoices {
        fn generate(&self, _at: DateTime<Utc>) -> String {
            format!("INV-{:04}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    struct Fixture {
        db: Database,
        clock: ManualClock,
        service: CheckoutService,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 2, 19, 9, 0, 0).unwrap());
        let service = CheckoutService::new(db.clone(), &CheckoutConfig::default())
            .with_clock(Arc::new(clock.clone()))
            .with_invoice_numbers(Arc::new(SequentialInvoices(AtomicUsize::new(0))));

        Fixture { db, clock, service }
    }

    async fn add_product(
        db: &Database,
        business_id: &str,
        name: &str,
        price_cents: i64,
        stock: Option<i64>,
    ) -> Product {
        let now = Utc::now();
        let p = Product {
            id: product::generate_product_id(),
            business_id: business_id.to_string(),
            name: name.to_string(),
            price_cents,
            cost_cents: None,
            enable_stock: stock.is_some(),
            stock_qty: stock,
            is_active: true,
            category_id: None,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&p).await.unwrap()
    }

    async fn stock_of(db: &Database, p: &Product) -> Option<i64> {
        db.products()
            .get_by_id_and_business(&p.id, &p.business_id)
            .await
            .unwrap()
            .unwrap()
            .stock_qty
    }

    fn cart(lines: &[(&Product, i64)]) -> CheckoutRequest {
        CheckoutRequest::new(
            lines
                .iter()
                .map(|(p, qty)| LineItemRequest::new(p.id.clone(), *qty))
                .collect(),
        )
    }

    fn code(err: &ServiceError) -> ErrorCode {
        err.code()
    }

    #[tokio::test]
    async fn test_edit_then_pay_walkthrough() {
        let f = fixture().await;
        let coffee = add_product(&f.db, BUSINESS, "Coffee", 1000, Some(5)).await;

        // Create with 3: stock 5 → 2
        let created = f
            .service
            .create_transaction(BUSINESS, CASHIER, cart(&[(&coffee, 3)]))
            .await
            .unwrap();
        let tx_id = created.transaction.id.clone();
        assert_eq!(created.transaction.status, TransactionStatus::Pending);
        assert_eq!(created.transaction.total_cents, 3000);
        assert_eq!(stock_of(&f.db, &coffee).await, Some(2));

        // Update to 6: only 5 exist once the 3 are given back
        let err = f
            .service
            .update_transaction(&tx_id, BUSINESS, cart(&[(&coffee, 6)]))
            .await
            .unwrap_err();
        match &err {
            ServiceError::Core(CoreError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(*available, 5);
                assert_eq!(*requested, 6);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(stock_of(&f.db, &coffee).await, Some(2));
        let unchanged = f.service.get_transaction(&tx_id, BUSINESS).await.unwrap();
        assert_eq!(unchanged.items, created.items);
        assert_eq!(unchanged.transaction.total_cents, 3000);

        // Update to 5: stock → 0, total 50.00
        let updated = f
            .service
            .update_transaction(&tx_id, BUSINESS, cart(&[(&coffee, 5)]))
            .await
            .unwrap();
        assert_eq!(updated.transaction.total_cents, 5000);
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items[0].quantity, 5);
        assert_eq!(stock_of(&f.db, &coffee).await, Some(0));

        // Pay exactly
        let paid = f.service.pay_transaction(&tx_id, BUSINESS, 5000).await.unwrap();
        assert_eq!(paid.transaction.status, TransactionStatus::Paid);
        assert_eq!(paid.transaction.change_cents, 0);
        assert_eq!(paid.transaction.paid_at, Some(f.clock.now()));

        // Paid is terminal
        let err = f.service.pay_transaction(&tx_id, BUSINESS, 5000).await.unwrap_err();
        assert_eq!(code(&err), ErrorCode::InvalidState);
        let err = f
            .service
            .update_transaction(&tx_id, BUSINESS, cart(&[(&coffee, 1)]))
            .await
            .unwrap_err();
        assert_eq!(code(&err), ErrorCode::InvalidState);
        assert_eq!(stock_of(&f.db, &coffee).await, Some(0));
    }

    #[tokio::test]
    async fn test_create_with_cash_is_paid() {
        let f = fixture().await;
        let coffee = add_product(&f.db, BUSINESS, "Coffee", 1099, Some(10)).await;
        let wrap = add_product(&f.db, BUSINESS, "Gift Wrap", 250, None).await;

        let detail = f
            .service
            .create_transaction(BUSINESS, CASHIER, cart(&[(&coffee, 2), (&wrap, 1)]).paid_with(3000))
            .await
            .unwrap();

        let tx = &detail.transaction;
        assert_eq!(tx.status, TransactionStatus::Paid);
        assert_eq!(tx.total_cents, 2448);
        assert_eq!(tx.received_cents, 3000);
        assert_eq!(tx.change_cents, 552);
        assert_eq!(tx.invoice_number, "INV-0001");
        assert_eq!(tx.created_by, CASHIER);
        assert_eq!(tx.expired_at, f.clock.now() + Duration::minutes(15));
        assert_eq!(stock_of(&f.db, &coffee).await, Some(8));

        let stored = f.service.get_transaction(&tx.id, BUSINESS).await.unwrap();
        assert_eq!(stored, detail);
    }

    #[tokio::test]
    async fn test_short_cash_writes_nothing() {
        let f = fixture().await;
        let coffee = add_product(&f.db, BUSINESS, "Coffee", 1000, Some(5)).await;

        let err = f
            .service
            .create_transaction(BUSINESS, CASHIER, cart(&[(&coffee, 3)]).paid_with(2999))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Core(CoreError::InsufficientPayment { required, received })
                if required.cents() == 3000 && received.cents() == 2999
        ));
        assert_eq!(stock_of(&f.db, &coffee).await, Some(5));
        let page = f.service.list_transactions(BUSINESS, ListQuery::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_rejected_cart_writes_nothing() {
        let f = fixture().await;
        let coffee = add_product(&f.db, BUSINESS, "Coffee", 1000, Some(5)).await;
        let cookie = add_product(&f.db, BUSINESS, "Cookie", 300, Some(1)).await;

        // Repeated lines share the cookie's single unit
        let err = f
            .service
            .create_transaction(
                BUSINESS,
                CASHIER,
                cart(&[(&coffee, 2), (&cookie, 1), (&cookie, 1)]),
            )
            .await
            .unwrap_err();
        assert_eq!(code(&err), ErrorCode::InsufficientStock);

        assert_eq!(stock_of(&f.db, &coffee).await, Some(5));
        assert_eq!(stock_of(&f.db, &cookie).await, Some(1));
        let page = f.service.list_transactions(BUSINESS, ListQuery::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_overflowing_total_writes_nothing() {
        let f = fixture().await;
        let coffee = add_product(&f.db, BUSINESS, "Coffee", 1000, Some(5)).await;
        let gold = add_product(&f.db, BUSINESS, "Gold Bar", i64::MAX / 2, None).await;

        let err = f
            .service
            .create_transaction(BUSINESS, CASHIER, cart(&[(&coffee, 1), (&gold, 3)]))
            .await
            .unwrap_err();
        assert_eq!(code(&err), ErrorCode::ValidationError);
        assert_eq!(stock_of(&f.db, &coffee).await, Some(5));

        let created = f
            .service
            .create_transaction(BUSINESS, CASHIER, cart(&[(&coffee, 2)]))
            .await
            .unwrap();
        let err = f
            .service
            .update_transaction(&created.transaction.id, BUSINESS, cart(&[(&gold, 3)]))
            .await
            .unwrap_err();
        assert_eq!(code(&err), ErrorCode::ValidationError);

        let stored = f.service.get_transaction(&created.transaction.id, BUSINESS).await.unwrap();
        assert_eq!(stored.transaction.total_cents, 2000);
        assert_eq!(stored.items[0].quantity, 2);
        assert_eq!(stock_of(&f.db, &coffee).await, Some(3));
    }

    #[tokio::test]
    async fn test_cart_validation() {
        let f = fixture().await;
        let coffee = add_product(&f.db, BUSINESS, "Coffee", 1000, Some(5)).await;
        let foreign = add_product(&f.db, OTHER_BUSINESS, "Foreign", 1000, Some(5)).await;

        let err = f
            .service
            .create_transaction(BUSINESS, CASHIER, CheckoutRequest::new(vec![]))
            .await
            .unwrap_err();
        assert_eq!(code(&err), ErrorCode::ValidationError);

        let err = f
            .service
            .create_transaction(BUSINESS, CASHIER, cart(&[(&coffee, 0)]))
            .await
            .unwrap_err();
        assert_eq!(code(&err), ErrorCode::ValidationError);

        let err = f
            .service
            .create_transaction(BUSINESS, CASHIER, cart(&[(&foreign, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::ProductNotOwned(_))));
        assert_eq!(stock_of(&f.db, &foreign).await, Some(5));

        let missing = LineItemRequest::new(product::generate_product_id(), 1);
        let err = f
            .service
            .create_transaction(BUSINESS, CASHIER, CheckoutRequest::new(vec![missing]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::ProductNotFound(_))));

        f.db.products().set_active(&coffee.id, BUSINESS, false).await.unwrap();
        let err = f
            .service
            .create_transaction(BUSINESS, CASHIER, cart(&[(&coffee, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::ProductInactive { .. })));
        assert_eq!(code(&err), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_update_swaps_products() {
        let f = fixture().await;
        let coffee = add_product(&f.db, BUSINESS, "Coffee", 1000, Some(5)).await;
        let tea = add_product(&f.db, BUSINESS, "Tea", 800, Some(4)).await;

        let created = f
            .service
            .create_transaction(BUSINESS, CASHIER, cart(&[(&coffee, 2)]))
            .await
            .unwrap();

        let updated = f
            .service
            .update_transaction(&created.transaction.id, BUSINESS, cart(&[(&tea, 3)]))
            .await
            .unwrap();

        assert_eq!(updated.transaction.total_cents, 2400);
        assert_eq!(updated.transaction.invoice_number, created.transaction.invoice_number);
        assert_eq!(stock_of(&f.db, &coffee).await, Some(5));
        assert_eq!(stock_of(&f.db, &tea).await, Some(1));

        let stored = f.service.get_transaction(&created.transaction.id, BUSINESS).await.unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].product_name, "Tea");
    }

    #[tokio::test]
    async fn test_repeated_update_is_stable() {
        let f = fixture().await;
        let coffee = add_product(&f.db, BUSINESS, "Coffee", 1000, Some(10)).await;

        let created = f
            .service
            .create_transaction(BUSINESS, CASHIER, cart(&[(&coffee, 2)]))
            .await
            .unwrap();
        let tx_id = created.transaction.id;
        assert_eq!(stock_of(&f.db, &coffee).await, Some(8));

        let first = f
            .service
            .update_transaction(&tx_id, BUSINESS, cart(&[(&coffee, 4)]))
            .await
            .unwrap();
        assert_eq!(first.transaction.total_cents, 4000);
        assert_eq!(stock_of(&f.db, &coffee).await, Some(6));

        // Same items again: everything restored then taken back
        let second = f
            .service
            .update_transaction(&tx_id, BUSINESS, cart(&[(&coffee, 4)]))
            .await
            .unwrap();
        assert_eq!(second.transaction.total_cents, 4000);
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].quantity, 4);
        assert_eq!(second.items[0].subtotal_cents, 4000);
        assert_eq!(stock_of(&f.db, &coffee).await, Some(6));

        let stored = f.service.get_transaction(&tx_id, BUSINESS).await.unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.transaction.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_with_cash_pays() {
        let f = fixture().await;
        let coffee = add_product(&f.db, BUSINESS, "Coffee", 1000, Some(5)).await;

        let created = f
            .service
            .create_transaction(BUSINESS, CASHIER, cart(&[(&coffee, 1)]))
            .await
            .unwrap();

        // Short cash on update rolls back the item change too
        let err = f
            .service
            .update_transaction(&created.transaction.id, BUSINESS, cart(&[(&coffee, 2)]).paid_with(1500))
            .await
            .unwrap_err();
        assert_eq!(code(&err), ErrorCode::InsufficientPayment);
        assert_eq!(stock_of(&f.db, &coffee).await, Some(4));

        let paid = f
            .service
            .update_transaction(&created.transaction.id, BUSINESS, cart(&[(&coffee, 2)]).paid_with(2500))
            .await
            .unwrap();
        assert_eq!(paid.transaction.status, TransactionStatus::Paid);
        assert_eq!(paid.transaction.change_cents, 500);
        assert_eq!(stock_of(&f.db, &coffee).await, Some(3));
    }

    #[tokio::test]
    async fn test_expiry_is_lazy() {
        let f = fixture().await;
        let coffee = add_product(&f.db, BUSINESS, "Coffee", 1000, Some(5)).await;

        let created = f
            .service
            .create_transaction(BUSINESS, CASHIER, cart(&[(&coffee, 1)]))
            .await
            .unwrap();
        let tx_id = created.transaction.id;

        // Exactly at expired_at is still in time
        f.clock.advance(Duration::minutes(15));
        f.service
            .update_transaction(&tx_id, BUSINESS, cart(&[(&coffee, 2)]))
            .await
            .unwrap();

        f.clock.advance(Duration::seconds(1));
        let err = f.service.pay_transaction(&tx_id, BUSINESS, 5000).await.unwrap_err();
        assert_eq!(code(&err), ErrorCode::Expired);
        let err = f
            .service
            .update_transaction(&tx_id, BUSINESS, cart(&[(&coffee, 1)]))
            .await
            .unwrap_err();
        assert_eq!(code(&err), ErrorCode::Expired);
        let err = f.service.cancel_transaction(&tx_id, BUSINESS).await.unwrap_err();
        assert_eq!(code(&err), ErrorCode::Expired);

        // Nothing was written: still pending, stock still held
        let stored = f.service.get_transaction(&tx_id, BUSINESS).await.unwrap();
        assert_eq!(stored.transaction.status, TransactionStatus::Pending);
        assert_eq!(stock_of(&f.db, &coffee).await, Some(3));
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let f = fixture().await;
        let coffee = add_product(&f.db, BUSINESS, "Coffee", 1000, Some(5)).await;

        let created = f
            .service
            .create_transaction(BUSINESS, CASHIER, cart(&[(&coffee, 2), (&coffee, 1)]))
            .await
            .unwrap();
        assert_eq!(stock_of(&f.db, &coffee).await, Some(2));

        let cancelled = f
            .service
            .cancel_transaction(&created.transaction.id, BUSINESS)
            .await
            .unwrap();
        assert_eq!(cancelled.transaction.status, TransactionStatus::Cancelled);
        assert_eq!(stock_of(&f.db, &coffee).await, Some(5));

        let err = f
            .service
            .cancel_transaction(&created.transaction.id, BUSINESS)
            .await
            .unwrap_err();
        assert_eq!(code(&err), ErrorCode::InvalidState);
        assert_eq!(stock_of(&f.db, &coffee).await, Some(5));
    }

    #[tokio::test]
    async fn test_other_business_sees_nothing() {
        let f = fixture().await;
        let coffee = add_product(&f.db, BUSINESS, "Coffee", 1000, Some(5)).await;

        let created = f
            .service
            .create_transaction(BUSINESS, CASHIER, cart(&[(&coffee, 1)]))
            .await
            .unwrap();
        let tx_id = created.transaction.id.as_str();

        let err = f.service.get_transaction(tx_id, OTHER_BUSINESS).await.unwrap_err();
        assert_eq!(code(&err), ErrorCode::NotFound);
        let err = f.service.pay_transaction(tx_id, OTHER_BUSINESS, 1000).await.unwrap_err();
        assert_eq!(code(&err), ErrorCode::NotFound);
        let err = f.service.cancel_transaction(tx_id, OTHER_BUSINESS).await.unwrap_err();
        assert_eq!(code(&err), ErrorCode::NotFound);
        let err = f
            .service
            .update_transaction(tx_id, OTHER_BUSINESS, cart(&[(&coffee, 1)]))
            .await
            .unwrap_err();
        assert_eq!(code(&err), ErrorCode::NotFound);

        let page = f
            .service
            .list_transactions(OTHER_BUSINESS, ListQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(stock_of(&f.db, &coffee).await, Some(4));
    }

    #[tokio::test]
    async fn test_list_newest_first_with_search() {
        let f = fixture().await;
        let coffee = add_product(&f.db, BUSINESS, "Coffee", 1000, None).await;

        let mut ids = Vec::new();
        for _ in 0..3 {
            let d = f
                .service
                .create_transaction(BUSINESS, CASHIER, cart(&[(&coffee, 1)]))
                .await
                .unwrap();
            ids.push(d.transaction.id);
            f.clock.advance(Duration::seconds(30));
        }

        let page = f.service.list_transactions(BUSINESS, ListQuery::default()).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.page_size, 20);
        let listed: Vec<_> = page.items.iter().map(|d| d.transaction.id.clone()).collect();
        assert_eq!(listed, vec![ids[2].clone(), ids[1].clone(), ids[0].clone()]);
        assert!(page.items.iter().all(|d| d.items.len() == 1));

        let page = f
            .service
            .list_transactions(
                BUSINESS,
                ListQuery {
                    search: Some("inv-0002".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].transaction.id, ids[1]);

        let page = f
            .service
            .list_transactions(
                BUSINESS,
                ListQuery {
                    page: Some(2),
                    page_size: Some(2),
                    search: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total_pages(), 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].transaction.id, ids[0]);

        let err = f
            .service
            .list_transactions(
                BUSINESS,
                ListQuery {
                    page_size: Some(101),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(code(&err), ErrorCode::ValidationError);

        let err = f
            .service
            .list_transactions(
                BUSINESS,
                ListQuery {
                    page: Some(i64::MAX),
                    page_size: Some(100),
                    search: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(code(&err), ErrorCode::ValidationError);

        // Wildcards in the search term match themselves only
        for term in ["%", "_"] {
            let page = f
                .service
                .list_transactions(
                    BUSINESS,
                    ListQuery {
                        search: Some(term.to_string()),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert_eq!(page.total, 0);
        }
    }

    #[tokio::test]
    async fn test_deleted_product_keeps_history() {
        let f = fixture().await;
        let coffee = add_product(&f.db, BUSINESS, "Coffee", 1000, Some(5)).await;
        let tea = add_product(&f.db, BUSINESS, "Tea", 800, Some(5)).await;

        let created = f
            .service
            .create_transaction(BUSINESS, CASHIER, cart(&[(&coffee, 1), (&tea, 2)]))
            .await
            .unwrap();
        f.db.products().delete(&coffee.id, BUSINESS).await.unwrap();

        let stored = f.service.get_transaction(&created.transaction.id, BUSINESS).await.unwrap();
        assert_eq!(stored.items[0].product_id, None);
        assert_eq!(stored.items[0].product_name, "Coffee");
        assert_eq!(stored.items[0].price_cents, 1000);

        // Cancel gives back only what still exists
        f.service
            .cancel_transaction(&created.transaction.id, BUSINESS)
            .await
            .unwrap();
        assert_eq!(stock_of(&f.db, &tea).await, Some(5));
    }

    #[tokio::test]
    async fn test_authorize() {
        let f = fixture().await;
        let cashier = Principal {
            user_id: CASHIER.to_string(),
            role: Role::Cashier,
            business_id: Some(BUSINESS.to_string()),
        };
        let admin = Principal {
            user_id: "root".to_string(),
            role: Role::Superadmin,
            business_id: None,
        };

        let create = Permission::either(Action::CreateTransaction);
        let update = Permission::either(Action::UpdateTransaction);

        assert!(f.service.authorize(&cashier, &create, BUSINESS).is_ok());
        let err = f.service.authorize(&cashier, &create, OTHER_BUSINESS).unwrap_err();
        assert_eq!(code(&err), ErrorCode::Forbidden);
        let err = f.service.authorize(&cashier, &update, BUSINESS).unwrap_err();
        assert_eq!(code(&err), ErrorCode::Forbidden);

        let granted = f.service.authorize(&admin, &update, OTHER_BUSINESS).unwrap();
        assert_eq!(granted, Permission::any(Action::UpdateTransaction));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_never_oversell() {
        let path = std::env::temp_dir().join(format!("qlaris-race-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(8)).await.unwrap();
        let service = CheckoutService::new(db.clone(), &CheckoutConfig::default());
        let coffee = add_product(&db, BUSINESS, "Coffee", 1000, Some(5)).await;

        let mut handles = Vec::new();
        for _ in 0..12 {
            let service = service.clone();
            let request = cart(&[(&coffee, 1)]);
            handles.push(tokio::spawn(async move {
                service.create_transaction(BUSINESS, CASHIER, request).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(err) => assert_eq!(code(&err), ErrorCode::InsufficientStock, "{err}"),
            }
        }

        assert_eq!(succeeded, 5);
        assert_eq!(stock_of(&db, &coffee).await, Some(0));
        let page = service.list_transactions(BUSINESS, ListQuery::default()).await.unwrap();
        assert_eq!(page.total, 5);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}
