//! # Unit of Work
//!
//! One SQLite transaction pinned to one connection.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  let mut uow = db.begin().await?;          BEGIN                        │
//! │                                                                         │
//! │  transaction::claim(uow.conn(), ..)        first statement is a write,  │
//! │  product::decrease_stock(uow.conn(), ..)   so the write lock is held    │
//! │  transaction::insert_items(uow.conn(), ..) from here on                 │
//! │       │                                                                 │
//! │       ├── any `?` returns early ──► drop ──► ROLLBACK                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  uow.commit().await?;                      COMMIT                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite upgrades a read transaction to a write transaction lazily, and
//! that upgrade fails outright (no busy wait) if another writer committed
//! in between. Callers therefore start every writing unit of work with a
//! write statement.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// An open database transaction.
///
/// Dropping it without calling [`commit`](UnitOfWork::commit) rolls back.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    pub(crate) async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let tx = pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!("Unit of work started");
        Ok(UnitOfWork { tx })
    }

    /// The connection every statement in this unit of work must run on.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    pub async fn commit(self) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!("Unit of work committed");
        Ok(())
    }

    /// Explicit rollback. Equivalent to dropping, but surfaces errors.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!("Unit of work rolled back");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
