//! Row models and PostgreSQL store implementations.
//!
//! Each module maps one table family to its `FromRow` row type and
//! implements the matching `northstar-escalation` store trait on top of a
//! [`DbPool`](crate::DbPool).

pub mod admin_notification;
pub mod directory;
pub mod escalation_rule;
pub mod incident;

pub use admin_notification::{AdminNotificationRow, PgNotificationStore};
pub use directory::{AdminRow, PgDirectory, StudentRow, SubUnitRow};
pub use escalation_rule::{EscalationRuleRow, PgRuleStore};
pub use incident::{IncidentRow, PgIncidentStore};

use crate::error::DbError;

/// Map a count or day value onto an `INTEGER` column.
pub(crate) fn to_column(column: &str, value: u32) -> Result<i32, DbError> {
    i32::try_from(value)
        .map_err(|_| DbError::ValidationFailed(format!("{column} out of range: {value}")))
}

/// Read an `INTEGER` column back. Negative values read as zero.
pub(crate) fn from_column(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}
