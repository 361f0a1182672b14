//! # Error Types
//!
//! Domain-specific error types for qlaris-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  qlaris-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  qlaris-db errors                                                       │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  qlaris-checkout errors                                                 │
//! │  ├── ServiceError     - CoreError | DbError                             │
//! │  └── ApiError         - What the HTTP layer serializes                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → ApiError            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Shortfall errors carry both sides of the comparison so the message a
//! cashier sees is actionable ("available 2, requested 6").

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::money::Money;
use crate::types::TransactionStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    ///
    /// ## When This Occurs
    /// - A checkout line references an id that doesn't exist
    /// - The product was hard-deleted between cart build and checkout
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but has been deactivated.
    #[error("Product {name} is not active")]
    ProductInactive { product_id: String, name: String },

    /// Product belongs to a different business.
    #[error("Product {0} does not belong to this business")]
    ProductNotOwned(String),

    /// Insufficient stock to complete the checkout.
    ///
    /// ## When This Occurs
    /// - Pricing sees a snapshot with too little stock
    /// - The conditional decrement loses a race to a concurrent checkout
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (Coffee x 6)
    ///      │
    ///      ▼
    /// UPDATE ... WHERE stock_qty >= 6  → 0 rows
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Coffee", available: 5, requested: 6 }
    ///      │
    ///      ▼
    /// UI shows: "Insufficient stock for Coffee: available 5, requested 6"
    /// ```
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// Cash handed over does not cover the total.
    #[error("Insufficient payment: required {required}, received {received}")]
    InsufficientPayment { required: Money, received: Money },

    /// Transaction not found (or owned by another business).
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Category not found (or owned by another business).
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Transaction is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Editing a paid transaction
    /// - Paying a cancelled transaction
    #[error("Transaction {transaction_id} is {current_status}, only pending transactions can be modified")]
    InvalidTransactionStatus {
        transaction_id: String,
        current_status: TransactionStatus,
    },

    /// Pending transaction whose edit window has closed.
    #[error("Transaction {transaction_id} expired at {expired_at}")]
    TransactionExpired {
        transaction_id: String,
        expired_at: DateTime<Utc>,
    },

    /// Caller's role does not grant the required permission.
    #[error("Forbidden: missing permission {permission}")]
    Forbidden { permission: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Same value supplied twice where each must be unique.
    #[error("{field} '{value}' is listed more than once")]
    Duplicate { field: String, value: String },

    /// Amount doesn't fit in the money representation.
    #[error("{field} is too large")]
    AmountTooLarge { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
