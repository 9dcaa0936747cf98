//! Connection pool wrapper.

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::config::{DbConfig, DEFAULT_MAX_CONNECTIONS};
use crate::error::DbError;

/// Shared PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct DbPool {
    pool: PgPool,
}

impl DbPool {
    /// Connect with the default pool size.
    ///
    /// # Errors
    ///
    /// Returns `DbError::ConnectionFailed` if the database is unreachable.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        Self::connect_with(database_url, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Connect using a loaded [`DbConfig`].
    ///
    /// # Errors
    ///
    /// Returns `DbError::ConnectionFailed` if the database is unreachable.
    pub async fn from_config(config: &DbConfig) -> Result<Self, DbError> {
        Self::connect_with(&config.database_url, config.max_connections).await
    }

    async fn connect_with(database_url: &str, max_connections: u32) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(DbError::ConnectionFailed)?;

        info!(max_connections, "Database pool connected");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying sqlx pool.
    #[must_use]
    pub fn inner(&self) -> &PgPool {
        &self.pool
    }
}
