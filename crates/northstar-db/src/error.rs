//! Database error types.

use northstar_escalation::EscalationError;
use thiserror::Error;

/// Database operation errors.
///
/// # Examples
///
/// ```
/// use northstar_db::DbError;
///
/// let err = DbError::NotFound("escalation rule".to_string());
/// assert!(err.is_not_found());
/// ```
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish a database connection.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// Failed to run a migration.
    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    /// A query failed to execute.
    #[error("Query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),

    /// The requested row was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A value could not be mapped to or from its column.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

impl DbError {
    /// Check if this is a connection error.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, DbError::ConnectionFailed(_))
    }

    /// Check if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound("row".to_string()),
            other => DbError::QueryFailed(other),
        }
    }
}

impl From<DbError> for EscalationError {
    fn from(err: DbError) -> Self {
        EscalationError::store(err)
    }
}
