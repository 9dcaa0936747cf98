//! Database configuration loaded from environment variables.

use std::env;

use thiserror::Error;

/// Default pool size when `DATABASE_MAX_CONNECTIONS` is unset.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Connection string (`DATABASE_URL`).
    pub database_url: String,
    /// Upper bound on pooled connections (`DATABASE_MAX_CONNECTIONS`).
    pub max_connections: u32,
}

impl DbConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVar` when `DATABASE_URL` is unset and
    /// `ConfigError::InvalidValue` when `DATABASE_MAX_CONNECTIONS` is not a
    /// positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => parse_max_connections(&raw)?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

fn parse_max_connections(raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            var: "DATABASE_MAX_CONNECTIONS".to_string(),
            message: format!("expected a positive integer, got {raw:?}"),
        }),
    }
}
