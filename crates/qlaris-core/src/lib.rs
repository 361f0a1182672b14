//! # qlaris-core: Pure Business Logic for Qlaris POS
//!
//! Everything the checkout engine decides without touching storage lives
//! here: money, pricing, validation, who may do what, and the seams for
//! time and invoice numbering.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Qlaris Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │            HTTP handlers (outside this workspace)               │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │   qlaris-checkout (Checkout, Category and Dashboard services)   │    │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘    │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────────┐   ┌───────────▼───────────────┐    │
//! │  │   ★ qlaris-core (THIS CRATE) ★  │   │  qlaris-db (SQLite)       │    │
//! │  │                                 │   │  repositories, unit of    │    │
//! │  │  money   pricing   validation   │   │  work, migrations         │    │
//! │  │  types   access    clock        │   └───────────────────────────┘    │
//! │  │  invoice ordering error         │                                    │
//! │  │  reporting                      │                                    │
//! │  │                                 │                                    │
//! │  │  NO I/O • NO DATABASE           │                                    │
//! │  └─────────────────────────────────┘                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, Transaction, Category, ...)
//! - [`money`] - Integer cents money type
//! - [`pricing`] - Cart pricing and cash settlement
//! - [`ordering`] - Category reorder planning
//! - [`reporting`] - Dashboard periods and figures
//! - [`access`] - Immutable role/permission policy
//! - [`clock`] - Time source abstraction
//! - [`invoice`] - Invoice number generation
//! - [`validation`] - Input validation rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use qlaris_core::money::Money;
//!
//! let price = Money::from_cents(1000); // $10.00
//! let subtotal = price.checked_mul_quantity(3);
//! assert_eq!(subtotal, Some(Money::from_cents(3000)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod clock;
pub mod error;
pub mod invoice;
pub mod money;
pub mod ordering;
pub mod pricing;
pub mod reporting;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{AccessPolicy, Action, Permission, Principal, Role, Scope};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{InvoiceNumberGenerator, RandomInvoiceNumbers};
pub use money::Money;
pub use ordering::plan_category_order;
pub use pricing::{settle_cash, CashSettlement, PricedCart, PricedLine, PricingCalculator};
pub use reporting::{
    DashboardSummary, PeriodComparison, PeriodStats, PeriodSummary, ProductSales, ReportingPeriods,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single checkout.
///
/// ## Business Reason
/// Prevents runaway carts and keeps a single unit of work short.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity on a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// How long a pending transaction stays editable/payable.
pub const DEFAULT_TRANSACTION_TTL_MINUTES: i64 = 15;

/// Largest page size accepted by list operations.
pub const MAX_PAGE_SIZE: i64 = 100;
