//! # Database Error Types
//!
//! ```text
//! sqlx::Error ──► DbError ──► ServiceError (qlaris-checkout) ──► ApiError
//!                    │
//!                    └── SQLite constraint text parsed into
//!                        Unique / ForeignKey / Check variants
//! ```
//!
//! Stock shortfalls never surface here: a guarded `UPDATE` that matches no
//! row is a normal `Ok(false)`, not an error.

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A scoped lookup or update matched nothing for (id, business_id).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// UNIQUE constraint failed. `constraint` is SQLite's column list,
    /// e.g. `categories.business_id, categories.sort_order`.
    #[error("Unique constraint failed on {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint failed (negative stock, zero quantity, ...).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// BEGIN, COMMIT or ROLLBACK failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No connection freed up within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Classifies a SQLite error message.
    ///
    /// SQLite reports constraints as:
    /// - `UNIQUE constraint failed: <table>.<column>[, ...]`
    /// - `FOREIGN KEY constraint failed`
    /// - `CHECK constraint failed: <expr>`
    fn from_sqlite_message(msg: &str) -> Self {
        if let Some(constraint) = msg.strip_prefix("UNIQUE constraint failed: ") {
            DbError::UniqueViolation {
                constraint: constraint.to_string(),
            }
        } else if msg.contains("FOREIGN KEY constraint failed") {
            DbError::ForeignKeyViolation {
                message: msg.to_string(),
            }
        } else if msg.contains("CHECK constraint failed") {
            DbError::CheckViolation {
                message: msg.to_string(),
            }
        } else {
            DbError::QueryFailed(msg.to_string())
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => DbError::from_sqlite_message(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
