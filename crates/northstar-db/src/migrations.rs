//! Embedded schema for the escalation tables.
//!
//! `migrations/0001_escalation.sql` creates the directory tables
//! (`organizations`, `sub_units`, `students`, `admins`) and the three
//! escalation tables:
//!
//! - `escalation_rules`: one row per (district, school) scope, enforced by
//!   `uq_escalation_rules_scope`. A NULL `sub_unit_id` is the district rule.
//! - `incidents`: indexed by student and `occurred_at` for window counts.
//! - `admin_notifications`: at most one row per (incident, rule, admin),
//!   enforced by `uq_admin_notifications_key`. A NULL `rule_id` means the
//!   system default rule fired. Unread rows have a partial index.
//!
//! Both unique indexes coalesce NULL to the nil UUID so that the district
//! rule and system-default notifications are keyed like any other row.

use crate::error::DbError;
use crate::pool::DbPool;

/// Apply pending escalation schema migrations in filename order.
///
/// # Example
///
/// ```rust,ignore
/// use northstar_db::{run_migrations, DbPool};
///
/// let pool = DbPool::connect("postgres://localhost/northstar").await?;
/// run_migrations(&pool).await?;
/// ```
///
/// # Errors
///
/// Returns `DbError::MigrationFailed` if any migration fails to apply.
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbError> {
    tracing::info!("Applying escalation schema migrations");

    sqlx::migrate!("./migrations")
        .run(pool.inner())
        .await
        .map_err(DbError::MigrationFailed)?;

    tracing::info!("Escalation schema is up to date");
    Ok(())
}
