//! Administrator notification rows.
//!
//! Uniqueness of (incident, rule, administrator) is enforced by
//! `uq_admin_notifications_key`; inserts use ON CONFLICT DO NOTHING so
//! concurrent escalation passes race safely.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use northstar_core::{
    AdminId, EscalationRuleId, IncidentId, NotificationId, OrganizationId, StudentId, SubUnitId,
};
use northstar_escalation::{Notification, NotificationKey, NotificationStore, Result};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::DbError;
use crate::pool::DbPool;

/// An `admin_notifications` row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AdminNotificationRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub sub_unit_id: Option<Uuid>,
    pub admin_id: Uuid,
    pub student_id: Uuid,
    pub incident_id: Uuid,
    pub rule_id: Option<Uuid>,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<AdminNotificationRow> for Notification {
    fn from(row: AdminNotificationRow) -> Self {
        Self {
            id: NotificationId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            sub_unit_id: row.sub_unit_id.map(SubUnitId::from_uuid),
            admin_id: AdminId::from_uuid(row.admin_id),
            student_id: StudentId::from_uuid(row.student_id),
            incident_id: IncidentId::from_uuid(row.incident_id),
            rule_id: row.rule_id.map(EscalationRuleId::from_uuid),
            message: row.message,
            read: row.read,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL-backed notification store.
#[derive(Debug, Clone)]
pub struct PgNotificationStore {
    pool: DbPool,
}

impl PgNotificationStore {
    /// Create a store over `pool`.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn exists_for(&self, key: NotificationKey) -> Result<bool> {
        let row: (bool,) = sqlx::query_as(
            r"
            SELECT EXISTS(
                SELECT 1 FROM admin_notifications
                WHERE incident_id = $1
                  AND rule_id IS NOT DISTINCT FROM $2
                  AND admin_id = $3
            )
            ",
        )
        .bind(key.incident_id.into_inner())
        .bind(key.rule_id.map(EscalationRuleId::into_inner))
        .bind(key.admin_id.into_inner())
        .fetch_one(self.pool.inner())
        .await
        .map_err(DbError::from)?;
        Ok(row.0)
    }

    async fn create(&self, notification: Notification) -> Result<Option<Notification>> {
        let result = sqlx::query(
            r"
            INSERT INTO admin_notifications (
                id, organization_id, sub_unit_id, admin_id, student_id,
                incident_id, rule_id, message, read, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (
                incident_id,
                (COALESCE(rule_id, '00000000-0000-0000-0000-000000000000'::uuid)),
                admin_id
            )
            DO NOTHING
            ",
        )
        .bind(notification.id.into_inner())
        .bind(notification.organization_id.into_inner())
        .bind(notification.sub_unit_id.map(SubUnitId::into_inner))
        .bind(notification.admin_id.into_inner())
        .bind(notification.student_id.into_inner())
        .bind(notification.incident_id.into_inner())
        .bind(notification.rule_id.map(EscalationRuleId::into_inner))
        .bind(&notification.message)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(self.pool.inner())
        .await
        .map_err(DbError::from)?;

        // 0 rows: another pass already notified this administrator
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(notification))
    }

    async fn find_unread_for_admin(&self, admin_id: AdminId) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, AdminNotificationRow>(
            r"
            SELECT
                id, organization_id, sub_unit_id, admin_id, student_id,
                incident_id, rule_id, message, read, created_at
            FROM admin_notifications
            WHERE admin_id = $1 AND NOT read
            ORDER BY created_at DESC
            ",
        )
        .bind(admin_id.into_inner())
        .fetch_all(self.pool.inner())
        .await
        .map_err(DbError::from)?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>> {
        let row = sqlx::query_as::<_, AdminNotificationRow>(
            r"
            SELECT
                id, organization_id, sub_unit_id, admin_id, student_id,
                incident_id, rule_id, message, read, created_at
            FROM admin_notifications
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool.inner())
        .await
        .map_err(DbError::from)?;
        Ok(row.map(Notification::from))
    }

    async fn mark_read(&self, id: NotificationId) -> Result<Option<Notification>> {
        let row = sqlx::query_as::<_, AdminNotificationRow>(
            r"
            UPDATE admin_notifications
            SET read = TRUE
            WHERE id = $1
            RETURNING
                id, organization_id, sub_unit_id, admin_id, student_id,
                incident_id, rule_id, message, read, created_at
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool.inner())
        .await
        .map_err(DbError::from)?;
        Ok(row.map(Notification::from))
    }
}
