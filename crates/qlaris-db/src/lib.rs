//! # qlaris-db: Database Layer for Qlaris POS
//!
//! SQLite storage for products, checkout transactions and categories, plus
//! the sales aggregates behind the dashboard, using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Qlaris Data Flow                                 │
//! │                                                                         │
//! │  CheckoutService::create_transaction                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     qlaris-db (THIS CRATE)                      │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌───────────────┐    │    │
//! │  │   │   Database    │   │  Repositories  │   │  Migrations   │    │    │
//! │  │   │   (pool.rs)   │   │                │   │  (embedded)   │    │    │
//! │  │   │               │   │ ProductRepo    │   │               │    │    │
//! │  │   │ SqlitePool    │◄──│ TransactionRepo│   │ 001_initial_  │    │    │
//! │  │   │ UnitOfWork    │   │ CategoryRepo   │   │   schema.sql  │    │    │
//! │  │   │               │   │ DashboardRepo  │   │               │    │    │
//! │  │   └───────────────┘   └────────────────┘   └───────────────┘    │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                SQLite Database (WAL mode)                       │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Two Ways In
//!
//! Repository methods (`db.products().list_by_business(..)`) run single
//! statements on any pooled connection. Multi-step writes open a
//! [`UnitOfWork`] and call the free functions in each repository module
//! (`repository::product::decrease_stock(uow.conn(), ..)`), which all take
//! `&mut SqliteConnection`.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`unit_of_work`] - Transaction wrapper with rollback on drop
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Product, transaction and category storage, dashboard
//!   aggregates
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qlaris_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("qlaris.db")).await?;
//!
//! let mut uow = db.begin().await?;
//! let taken = qlaris_db::repository::product::decrease_stock(
//!     uow.conn(), "business-1", "product-1", 2, chrono::Utc::now(),
//! ).await?;
//! uow.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::dashboard::DashboardRepository;
pub use repository::product::ProductRepository;
pub use repository::transaction::TransactionRepository;
