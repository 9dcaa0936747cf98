//! Incident rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use northstar_core::{IncidentId, OrganizationId, StudentId, SubUnitId};
use northstar_escalation::{Incident, IncidentStore, Result};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::DbError;
use crate::pool::DbPool;

/// An `incidents` row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct IncidentRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub sub_unit_id: Uuid,
    pub student_id: Uuid,
    pub category: String,
    pub severity: String,
    pub description: Option<String>,
    pub reported_by: String,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<IncidentRow> for Incident {
    fn from(row: IncidentRow) -> Self {
        Self {
            id: IncidentId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            sub_unit_id: SubUnitId::from_uuid(row.sub_unit_id),
            student_id: StudentId::from_uuid(row.student_id),
            category: row.category,
            severity: row.severity,
            description: row.description,
            reported_by: row.reported_by,
            occurred_at: row.occurred_at,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL-backed incident store.
#[derive(Debug, Clone)]
pub struct PgIncidentStore {
    pool: DbPool,
}

impl PgIncidentStore {
    /// Create a store over `pool`.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IncidentStore for PgIncidentStore {
    async fn find_by_student_ordered_by_occurrence_desc(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Incident>> {
        let rows = sqlx::query_as::<_, IncidentRow>(
            r"
            SELECT
                id, organization_id, sub_unit_id, student_id, category, severity,
                description, reported_by, occurred_at, created_at
            FROM incidents
            WHERE student_id = $1
            ORDER BY occurred_at DESC, id
            ",
        )
        .bind(student_id.into_inner())
        .fetch_all(self.pool.inner())
        .await
        .map_err(DbError::from)?;
        Ok(rows.into_iter().map(Incident::from).collect())
    }

    async fn create(&self, incident: Incident) -> Result<Incident> {
        let row = sqlx::query_as::<_, IncidentRow>(
            r"
            INSERT INTO incidents (
                id, organization_id, sub_unit_id, student_id, category, severity,
                description, reported_by, occurred_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING
                id, organization_id, sub_unit_id, student_id, category, severity,
                description, reported_by, occurred_at, created_at
            ",
        )
        .bind(incident.id.into_inner())
        .bind(incident.organization_id.into_inner())
        .bind(incident.sub_unit_id.into_inner())
        .bind(incident.student_id.into_inner())
        .bind(&incident.category)
        .bind(&incident.severity)
        .bind(&incident.description)
        .bind(&incident.reported_by)
        .bind(incident.occurred_at)
        .bind(incident.created_at)
        .fetch_one(self.pool.inner())
        .await
        .map_err(DbError::from)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: IncidentId) -> Result<Option<Incident>> {
        let row = sqlx::query_as::<_, IncidentRow>(
            r"
            SELECT
                id, organization_id, sub_unit_id, student_id, category, severity,
                description, reported_by, occurred_at, created_at
            FROM incidents
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool.inner())
        .await
        .map_err(DbError::from)?;
        Ok(row.map(Incident::from))
    }
}
