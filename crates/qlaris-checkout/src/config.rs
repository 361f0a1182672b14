//! Checkout engine configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::path::PathBuf;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use qlaris_core::{DEFAULT_TRANSACTION_TTL_MINUTES, MAX_PAGE_SIZE};
use qlaris_db::DbConfig;

/// Checkout engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Connection pool size
    pub db_max_connections: u32,

    /// How long a pending transaction stays editable, in minutes
    pub transaction_ttl_minutes: i64,

    /// Page size when a list request doesn't give one
    pub default_page_size: i64,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        CheckoutConfig {
            database_path: PathBuf::from("./qlaris.db"),
            db_max_connections: 5,
            transaction_ttl_minutes: DEFAULT_TRANSACTION_TTL_MINUTES,
            default_page_size: 20,
        }
    }
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = CheckoutConfig::default();

        let parse = |key: &str| -> Result<Option<i64>, ConfigError> {
            lookup(key)
                .map(|v| {
                    v.trim()
                        .parse::<i64>()
                        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
                })
                .transpose()
        };

        let config = CheckoutConfig {
            database_path: lookup("QLARIS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            db_max_connections: match parse("QLARIS_DB_MAX_CONNECTIONS")? {
                Some(n) => u32::try_from(n)
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ConfigError::InvalidValue("QLARIS_DB_MAX_CONNECTIONS".to_string()))?,
                None => defaults.db_max_connections,
            },

            transaction_ttl_minutes: parse("QLARIS_TRANSACTION_TTL_MINUTES")?
                .unwrap_or(defaults.transaction_ttl_minutes),

            default_page_size: parse("QLARIS_DEFAULT_PAGE_SIZE")?
                .unwrap_or(defaults.default_page_size),
        };

        if config.transaction_ttl_minutes <= 0 {
            return Err(ConfigError::InvalidValue(
                "QLARIS_TRANSACTION_TTL_MINUTES".to_string(),
            ));
        }

        if !(1..=MAX_PAGE_SIZE).contains(&config.default_page_size) {
            return Err(ConfigError::InvalidValue("QLARIS_DEFAULT_PAGE_SIZE".to_string()));
        }

        Ok(config)
    }

    /// Expiry window for new transactions.
    pub fn transaction_ttl(&self) -> Duration {
        Duration::minutes(self.transaction_ttl_minutes)
    }

    /// Pool settings for [`qlaris_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.db_max_connections)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
