//! # qlaris-checkout: Checkout Engine for Qlaris POS
//!
//! Ties pricing rules from `qlaris-core` to storage in `qlaris-db`: the
//! transaction lifecycle, stock consistency, category management and the
//! sales dashboard. The HTTP layer calls into [`Engine`] after
//! authenticating the caller.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      qlaris-checkout Architecture                       │
//! │                                                                         │
//! │  HTTP handler (outside this workspace)                                  │
//! │       │  Principal, business_id, request body                           │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                          Engine                                 │    │
//! │  │                                                                 │    │
//! │  │  ┌───────────────────────┐     ┌───────────────────────┐        │    │
//! │  │  │   CheckoutService     │     │   CategoryService     │        │    │
//! │  │  │ create/update/pay/    │     │ create/get/rename/    │        │    │
//! │  │  │ cancel/get/list       │     │ delete/list/sort      │        │    │
//! │  │  └──────────┬────────────┘     └───────────┬───────────┘        │    │
//! │  │             │  ProductStock                │  DashboardService  │    │
//! │  │             ▼                              ▼                    │    │
//! │  │        qlaris-db: Database, UnitOfWork, repositories            │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼  ServiceError ──► ApiError { code, message } + HTTP status      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`checkout`] - Transaction lifecycle
//! - [`stock`] - Stock decrement and restore on a unit of work
//! - [`category`] - Category management and reordering
//! - [`dashboard`] - Period sales figures and best sellers
//! - [`config`] - Environment configuration
//! - [`error`] - Service errors and client error bodies
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qlaris_checkout::{init_tracing, CheckoutConfig, CheckoutRequest, Engine};
//! use qlaris_core::LineItemRequest;
//!
//! init_tracing();
//! let engine = Engine::open(&CheckoutConfig::load()?).await?;
//!
//! let detail = engine
//!     .checkout
//!     .create_transaction(
//!         "business-1",
//!         "user-1",
//!         CheckoutRequest::new(vec![LineItemRequest::new(product_id, 2)]),
//!     )
//!     .await?;
//! ```

pub mod category;
pub mod checkout;
pub mod dashboard;
pub mod config;
pub mod error;
pub mod stock;

pub use category::CategoryService;
pub use checkout::{CheckoutRequest, CheckoutService, ListQuery};
pub use dashboard::DashboardService;
pub use config::{CheckoutConfig, ConfigError};
pub use error::{ApiError, ErrorCode, ServiceError, ServiceResult};
pub use stock::ProductStock;

use tracing::info;
use tracing_subscriber::EnvFilter;

use qlaris_db::Database;

/// Database handle plus the services built on it.
#[derive(Clone)]
pub struct Engine {
    pub db: Database,
    pub checkout: CheckoutService,
    pub categories: CategoryService,
    pub dashboard: DashboardService,
}

impl Engine {
    /// Opens the database (running migrations) and builds the services.
    pub async fn open(config: &CheckoutConfig) -> ServiceResult<Self> {
        info!(path = ?config.database_path, "Opening checkout engine");

        let db = Database::new(config.db_config()).await?;
        Ok(Engine::with_database(db, config))
    }

    /// Builds the services on an existing database handle.
    pub fn with_database(db: Database, config: &CheckoutConfig) -> Self {
        Engine {
            checkout: CheckoutService::new(db.clone(), config),
            categories: CategoryService::new(db.clone()),
            dashboard: DashboardService::new(db.clone()),
            db,
        }
    }
}

/// Initializes tracing with an env-overridable filter.
///
/// `RUST_LOG` wins when set; otherwise info everywhere, debug for this
/// workspace, warn for sqlx. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,qlaris=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use qlaris_core::LineItemRequest;
    use qlaris_db::DbConfig;

    #[tokio::test]
    async fn test_engine_end_to_end() {
        init_tracing();
        init_tracing();

        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let engine = Engine::with_database(db, &CheckoutConfig::default());

        let drinks = engine.categories.create_category("b-1", "Drinks").await.unwrap();
        assert_eq!(drinks.sort_order, 1);

        let product_id = qlaris_db::repository::product::generate_product_id();
        let missing = engine
            .checkout
            .create_transaction(
                "b-1",
                "u-1",
                CheckoutRequest::new(vec![LineItemRequest::new(product_id, 1)]),
            )
            .await
            .unwrap_err();

        let api = ApiError::from(missing);
        assert_eq!(api.code, ErrorCode::NotFound);
        assert_eq!(api.http_status(), 404);

        let summary = engine.dashboard.summary("b-1").await.unwrap();
        assert_eq!(summary.today.current.transactions, 0);
    }
}
