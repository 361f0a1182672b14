//! # Transaction Repository
//!
//! Persistence for checkout transactions and their items.
//!
//! ## Transaction Lifecycle (storage view)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Statements per operation                             │
//! │                                                                         │
//! │  CREATE   insert()  insert_items()                                      │
//! │                                                                         │
//! │  UPDATE   claim()  find()  find_items()                                 │
//! │           delete_items()  insert_items()  save_pending()                │
//! │                                                                         │
//! │  PAY      claim()  find()  save_pending()                               │
//! │                                                                         │
//! │  CANCEL   claim()  find()  find_items()  save_pending()                 │
//! │                                                                         │
//! │  Every write is scoped by (id, business_id). save_pending() also        │
//! │  requires status = 'pending', so a terminal row is never rewritten.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::{contains_pattern, page_offset};
use crate::error::DbResult;
use qlaris_core::{Transaction, TransactionDetail, TransactionItem};

const TRANSACTION_COLUMNS: &str = "id, business_id, created_by, invoice_number, total_cents, \
     received_cents, change_cents, status, paid_at, expired_at, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, transaction_id, product_id, product_name, price_cents, \
     quantity, subtotal_cents, created_at";

/// Repository for transaction reads that don't need a unit of work.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Gets a transaction and its items, scoped to the business.
    pub async fn get_by_id_and_business(
        &self,
        id: &str,
        business_id: &str,
    ) -> DbResult<Option<TransactionDetail>> {
        let mut conn = self.pool.acquire().await?;

        let Some(transaction) = find(&mut conn, id, business_id).await? else {
            return Ok(None);
        };
        let items = find_items(&mut conn, id).await?;

        Ok(Some(TransactionDetail { transaction, items }))
    }

    /// Lists a business's transactions, newest first.
    ///
    /// ## Arguments
    /// * `search` - case-insensitive substring of the invoice number
    /// * `page` - 1-based
    ///
    /// ## Returns
    /// `(transactions with items, total matching)`
    pub async fn list_by_business(
        &self,
        business_id: &str,
        search: Option<&str>,
        page: i64,
        page_size: i64,
    ) -> DbResult<(Vec<TransactionDetail>, i64)> {
        debug!(business_id = %business_id, ?search, page, page_size, "Listing transactions");
        let pattern = search.map(contains_pattern);

        let mut conn = self.pool.acquire().await?;

        let sql = format!(
            r#"
            SELECT {}
            FROM transactions
            WHERE business_id = ?1
              AND (?2 IS NULL OR invoice_number LIKE ?2 ESCAPE '\')
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?3 OFFSET ?4
            "#,
            TRANSACTION_COLUMNS
        );

        let transactions = sqlx::query_as::<_, Transaction>(&sql)
            .bind(business_id)
            .bind(pattern.as_deref())
            .bind(page_size)
            .bind(page_offset(page, page_size))
            .fetch_all(&mut *conn)
            .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM transactions
            WHERE business_id = ?1
              AND (?2 IS NULL OR invoice_number LIKE ?2 ESCAPE '\')
            "#,
        )
        .bind(business_id)
        .bind(pattern.as_deref())
        .fetch_one(&mut *conn)
        .await?;

        let ids: Vec<&str> = transactions.iter().map(|t| t.id.as_str()).collect();
        let mut items_by_transaction = find_items_for(&mut conn, &ids).await?;

        let details = transactions
            .into_iter()
            .map(|transaction| {
                let items = items_by_transaction
                    .remove(&transaction.id)
                    .unwrap_or_default();
                TransactionDetail { transaction, items }
            })
            .collect();

        Ok((details, total))
    }
}

// =============================================================================
// Unit-of-Work Functions
// =============================================================================

/// Inserts a transaction row.
pub async fn insert(conn: &mut SqliteConnection, transaction: &Transaction) -> DbResult<()> {
    debug!(
        id = %transaction.id,
        invoice_number = %transaction.invoice_number,
        "Inserting transaction"
    );

    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, business_id, created_by, invoice_number,
            total_cents, received_cents, change_cents, status,
            paid_at, expired_at, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.business_id)
    .bind(&transaction.created_by)
    .bind(&transaction.invoice_number)
    .bind(transaction.total_cents)
    .bind(transaction.received_cents)
    .bind(transaction.change_cents)
    .bind(transaction.status)
    .bind(transaction.paid_at)
    .bind(transaction.expired_at)
    .bind(transaction.created_at)
    .bind(transaction.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts item rows in one statement.
pub async fn insert_items(conn: &mut SqliteConnection, items: &[TransactionItem]) -> DbResult<()> {
    if items.is_empty() {
        return Ok(());
    }

    debug!(
        transaction_id = %items[0].transaction_id,
        count = items.len(),
        "Inserting transaction items"
    );

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "INSERT INTO transaction_items ({}) ",
        ITEM_COLUMNS
    ));
    query.push_values(items, |mut row, item| {
        row.push_bind(&item.id)
            .push_bind(&item.transaction_id)
            .push_bind(&item.product_id)
            .push_bind(&item.product_name)
            .push_bind(item.price_cents)
            .push_bind(item.quantity)
            .push_bind(item.subtotal_cents)
            .push_bind(item.created_at);
    });

    query.build().execute(&mut *conn).await?;
    Ok(())
}

/// Deletes every item of a transaction.
pub async fn delete_items(conn: &mut SqliteConnection, transaction_id: &str) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM transaction_items WHERE transaction_id = ?1")
        .bind(transaction_id)
        .execute(&mut *conn)
        .await?;

    debug!(transaction_id = %transaction_id, deleted = result.rows_affected(), "Deleted items");
    Ok(result.rows_affected())
}

/// Takes the write lock on a transaction row before reading it.
///
/// A no-op write scoped by (id, business_id). Run it as the first statement
/// of a unit of work so concurrent edits of the same transaction serialize
/// instead of both reading the same pending state.
///
/// ## Returns
/// `false` if no such transaction exists for the business.
pub async fn claim(conn: &mut SqliteConnection, id: &str, business_id: &str) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE transactions SET updated_at = updated_at WHERE id = ?1 AND business_id = ?2",
    )
    .bind(id)
    .bind(business_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Gets a transaction scoped to the business.
pub async fn find(
    conn: &mut SqliteConnection,
    id: &str,
    business_id: &str,
) -> DbResult<Option<Transaction>> {
    let sql = format!(
        "SELECT {} FROM transactions WHERE id = ?1 AND business_id = ?2",
        TRANSACTION_COLUMNS
    );

    let transaction = sqlx::query_as::<_, Transaction>(&sql)
        .bind(id)
        .bind(business_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(transaction)
}

/// Gets a transaction's items in the order they were inserted.
pub async fn find_items(
    conn: &mut SqliteConnection,
    transaction_id: &str,
) -> DbResult<Vec<TransactionItem>> {
    let sql = format!(
        "SELECT {} FROM transaction_items WHERE transaction_id = ?1 ORDER BY rowid",
        ITEM_COLUMNS
    );

    let items = sqlx::query_as::<_, TransactionItem>(&sql)
        .bind(transaction_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(items)
}

/// Gets items for several transactions in one query, grouped by
/// transaction id.
async fn find_items_for(
    conn: &mut SqliteConnection,
    transaction_ids: &[&str],
) -> DbResult<HashMap<String, Vec<TransactionItem>>> {
    let mut grouped: HashMap<String, Vec<TransactionItem>> = HashMap::new();
    if transaction_ids.is_empty() {
        return Ok(grouped);
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM transaction_items WHERE transaction_id IN (",
        ITEM_COLUMNS
    ));
    let mut separated = query.separated(", ");
    for id in transaction_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY rowid");

    let items = query
        .build_query_as::<TransactionItem>()
        .fetch_all(&mut *conn)
        .await?;

    for item in items {
        grouped
            .entry(item.transaction_id.clone())
            .or_default()
            .push(item);
    }

    Ok(grouped)
}

/// Writes totals, payment fields and status of a still-pending transaction.
///
/// ## Returns
/// `false` if the row is no longer pending (or doesn't exist); nothing is
/// written in that case.
pub async fn save_pending(
    conn: &mut SqliteConnection,
    transaction: &Transaction,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    debug!(
        id = %transaction.id,
        status = %transaction.status,
        total_cents = transaction.total_cents,
        "Saving transaction"
    );

    let result = sqlx::query(
        r#"
        UPDATE transactions
        SET total_cents = ?3,
            received_cents = ?4,
            change_cents = ?5,
            status = ?6,
            paid_at = ?7,
            updated_at = ?8
        WHERE id = ?1
          AND business_id = ?2
          AND status = 'pending'
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.business_id)
    .bind(transaction.total_cents)
    .bind(transaction.received_cents)
    .bind(transaction.change_cents)
    .bind(transaction.status)
    .bind(transaction.paid_at)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Generates a new transaction ID.
pub fn generate_transaction_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new transaction item ID.
pub fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
