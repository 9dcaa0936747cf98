//! Northstar Database Layer
//!
//! PostgreSQL implementations of the escalation store traits, with a
//! connection pool and embedded migrations.
//!
//! # Example
//!
//! ```rust,ignore
//! use northstar_db::{run_migrations, DbConfig, DbPool, PgStores};
//!
//! let pool = DbPool::from_config(&DbConfig::from_env()?).await?;
//! run_migrations(&pool).await?;
//! let engine = EscalationEngine::new(PgStores::new(pool).engine_stores(), EngineConfig::from_env());
//! ```

pub mod config;
pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

use std::sync::Arc;

use northstar_escalation::EngineStores;

pub use config::{ConfigError, DbConfig};
pub use error::DbError;
pub use migrations::run_migrations;
pub use models::{PgDirectory, PgIncidentStore, PgNotificationStore, PgRuleStore};
pub use pool::DbPool;

/// Every PostgreSQL store over one pool.
#[derive(Debug, Clone)]
pub struct PgStores {
    pub directory: Arc<PgDirectory>,
    pub rules: Arc<PgRuleStore>,
    pub incidents: Arc<PgIncidentStore>,
    pub notifications: Arc<PgNotificationStore>,
}

impl PgStores {
    /// Build all stores over `pool`.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self {
            directory: Arc::new(PgDirectory::new(pool.clone())),
            rules: Arc::new(PgRuleStore::new(pool.clone())),
            incidents: Arc::new(PgIncidentStore::new(pool.clone())),
            notifications: Arc::new(PgNotificationStore::new(pool)),
        }
    }

    /// Engine wiring over these stores.
    #[must_use]
    pub fn engine_stores(&self) -> EngineStores {
        EngineStores {
            directory: self.directory.clone(),
            admins: self.directory.clone(),
            rules: self.rules.clone(),
            incidents: self.incidents.clone(),
            notifications: self.notifications.clone(),
        }
    }
}
