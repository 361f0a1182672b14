//! # Service and API Errors
//!
//! What a checkout operation can fail with, and what the caller is told.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Qlaris                                 │
//! │                                                                         │
//! │  CheckoutService::pay_transaction                                       │
//! │       │                                                                 │
//! │       ├── ValidationError ───────┐                                      │
//! │       ├── CoreError ─────────────┼──► ServiceError ──► ApiError         │
//! │       └── DbError ───────────────┘        │              │              │
//! │                                           │              ▼              │
//! │                            uow dropped ◄──┘   { "code": "EXPIRED",      │
//! │                            (ROLLBACK)           "message": "..." }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persistence failures are logged with their detail and reported to the
//! client as a generic `INTERNAL` message.

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use qlaris_core::{CoreError, ValidationError};
use qlaris_db::DbError;

// =============================================================================
// Service Error
// =============================================================================

/// Error returned by every service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A business rule or input check failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The database failed.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Core(CoreError::Validation(err))
    }
}

impl ServiceError {
    /// Classifies the error for the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Core(err) => core_code(err),
            ServiceError::Db(DbError::NotFound { .. }) => ErrorCode::NotFound,
            ServiceError::Db(_) => ErrorCode::Internal,
        }
    }
}

fn core_code(err: &CoreError) -> ErrorCode {
    match err {
        CoreError::Validation(_) | CoreError::ProductInactive { .. } => ErrorCode::ValidationError,
        CoreError::ProductNotFound(_)
        | CoreError::ProductNotOwned(_)
        | CoreError::TransactionNotFound(_)
        | CoreError::CategoryNotFound(_) => ErrorCode::NotFound,
        CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
        CoreError::InsufficientPayment { .. } => ErrorCode::InsufficientPayment,
        CoreError::InvalidTransactionStatus { .. } => ErrorCode::InvalidState,
        CoreError::TransactionExpired { .. } => ErrorCode::Expired,
        CoreError::Forbidden { .. } => ErrorCode::Forbidden,
    }
}

/// Convenience type alias for service results.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// API Error
// =============================================================================

/// Error body handed to the HTTP layer.
///
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for Coffee: available 5, requested 6"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or missing input (400)
    ValidationError,

    /// Absent, or owned by another business (404)
    NotFound,

    /// Not enough stock for a line (400)
    InsufficientStock,

    /// Cash received below the total (400)
    InsufficientPayment,

    /// Transaction is no longer pending (400)
    InvalidState,

    /// Pending transaction past its expiry (400)
    Expired,

    /// Role lacks the permission (403)
    Forbidden,

    /// Anything the caller can't fix (500)
    Internal,
}

impl ErrorCode {
    /// HTTP status the handler should answer with.
    pub const fn http_status(&self) -> u16 {
        match self {
            ErrorCode::ValidationError
            | ErrorCode::InsufficientStock
            | ErrorCode::InsufficientPayment
            | ErrorCode::InvalidState
            | ErrorCode::Expired => 400,
            ErrorCode::NotFound => 404,
            ErrorCode::Forbidden => 403,
            ErrorCode::Internal => 500,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", entity, id))
            }
            DbError::ConnectionFailed(e) | DbError::MigrationFailed(e) => {
                tracing::error!("Database unavailable: {}", e);
                ApiError::internal("Database unavailable")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::internal("Database transaction failed")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::internal("Server busy, try again")
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", other);
                ApiError::internal("Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors. Domain messages already name the
/// shortfall, so most pass through unchanged.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = core_code(&err);
        match err {
            // Don't reveal that the id exists in another business
            CoreError::ProductNotOwned(id) => ApiError::new(code, format!("Product not found: {}", id)),
            other => ApiError::new(code, other.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Core(e) => ApiError::from(e),
            ServiceError::Db(e) => ApiError::from(e),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Unit Tests
// =============================================================================
