//! Districts, schools, students and administrators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use northstar_core::{AdminId, OrganizationId, StudentId, SubUnitId};
use northstar_escalation::{Admin, AdminDirectory, Result, Student, SubUnit, TenantDirectory};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::DbError;
use crate::pool::DbPool;

/// A school row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubUnitRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
}

impl From<SubUnitRow> for SubUnit {
    fn from(row: SubUnitRow) -> Self {
        Self {
            id: SubUnitId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            name: row.name,
        }
    }
}

/// A student row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub sub_unit_id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Self {
            id: StudentId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            sub_unit_id: SubUnitId::from_uuid(row.sub_unit_id),
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}

/// An administrator row. `sub_unit_id` is NULL for district-wide staff.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AdminRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub sub_unit_id: Option<Uuid>,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<AdminRow> for Admin {
    fn from(row: AdminRow) -> Self {
        Self {
            id: AdminId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            sub_unit_id: row.sub_unit_id.map(SubUnitId::from_uuid),
            name: row.name,
            role: row.role,
        }
    }
}

impl AdminRow {
    /// Administrators assigned to one school.
    pub async fn find_by_sub_unit(
        pool: &PgPool,
        sub_unit_id: Uuid,
    ) -> std::result::Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AdminRow>(
            r"
            SELECT id, organization_id, sub_unit_id, name, role, created_at
            FROM admins
            WHERE sub_unit_id = $1
            ORDER BY id
            ",
        )
        .bind(sub_unit_id)
        .fetch_all(pool)
        .await
    }

    /// District-wide administrators only.
    pub async fn find_org_wide(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> std::result::Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AdminRow>(
            r"
            SELECT id, organization_id, sub_unit_id, name, role, created_at
            FROM admins
            WHERE organization_id = $1 AND sub_unit_id IS NULL
            ORDER BY id
            ",
        )
        .bind(organization_id)
        .fetch_all(pool)
        .await
    }
}

/// PostgreSQL-backed tenant and administrator directory.
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: DbPool,
}

impl PgDirectory {
    /// Create a directory over `pool`.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a district.
    ///
    /// # Errors
    ///
    /// Returns `DbError::QueryFailed` if the insert fails.
    pub async fn create_organization(
        &self,
        id: OrganizationId,
        name: &str,
    ) -> std::result::Result<(), DbError> {
        sqlx::query("INSERT INTO organizations (id, name) VALUES ($1, $2)")
            .bind(id.into_inner())
            .bind(name)
            .execute(self.pool.inner())
            .await?;
        Ok(())
    }

    /// Insert a school.
    ///
    /// # Errors
    ///
    /// Returns `DbError::QueryFailed` if the insert fails.
    pub async fn create_sub_unit(&self, sub_unit: &SubUnit) -> std::result::Result<(), DbError> {
        sqlx::query("INSERT INTO sub_units (id, organization_id, name) VALUES ($1, $2, $3)")
            .bind(sub_unit.id.into_inner())
            .bind(sub_unit.organization_id.into_inner())
            .bind(&sub_unit.name)
            .execute(self.pool.inner())
            .await?;
        Ok(())
    }

    /// Insert a student.
    ///
    /// # Errors
    ///
    /// Returns `DbError::QueryFailed` if the insert fails.
    pub async fn create_student(&self, student: &Student) -> std::result::Result<(), DbError> {
        sqlx::query(
            r"
            INSERT INTO students (id, organization_id, sub_unit_id, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(student.id.into_inner())
        .bind(student.organization_id.into_inner())
        .bind(student.sub_unit_id.into_inner())
        .bind(&student.first_name)
        .bind(&student.last_name)
        .execute(self.pool.inner())
        .await?;
        Ok(())
    }

    /// Insert an administrator.
    ///
    /// # Errors
    ///
    /// Returns `DbError::QueryFailed` if the insert fails.
    pub async fn create_admin(&self, admin: &Admin) -> std::result::Result<(), DbError> {
        sqlx::query(
            r"
            INSERT INTO admins (id, organization_id, sub_unit_id, name, role)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(admin.id.into_inner())
        .bind(admin.organization_id.into_inner())
        .bind(admin.sub_unit_id.map(SubUnitId::into_inner))
        .bind(&admin.name)
        .bind(&admin.role)
        .execute(self.pool.inner())
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TenantDirectory for PgDirectory {
    async fn organization_exists(&self, organization_id: OrganizationId) -> Result<bool> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM organizations WHERE id = $1)")
                .bind(organization_id.into_inner())
                .fetch_one(self.pool.inner())
                .await
                .map_err(DbError::from)?;
        Ok(row.0)
    }

    async fn find_sub_unit(&self, sub_unit_id: SubUnitId) -> Result<Option<SubUnit>> {
        let row = sqlx::query_as::<_, SubUnitRow>(
            "SELECT id, organization_id, name FROM sub_units WHERE id = $1",
        )
        .bind(sub_unit_id.into_inner())
        .fetch_optional(self.pool.inner())
        .await
        .map_err(DbError::from)?;
        Ok(row.map(SubUnit::from))
    }

    async fn find_student(&self, student_id: StudentId) -> Result<Option<Student>> {
        let row = sqlx::query_as::<_, StudentRow>(
            r"
            SELECT id, organization_id, sub_unit_id, first_name, last_name
            FROM students
            WHERE id = $1
            ",
        )
        .bind(student_id.into_inner())
        .fetch_optional(self.pool.inner())
        .await
        .map_err(DbError::from)?;
        Ok(row.map(Student::from))
    }
}

#[async_trait]
impl AdminDirectory for PgDirectory {
    async fn find_by_sub_unit(&self, sub_unit_id: SubUnitId) -> Result<Vec<Admin>> {
        let rows = AdminRow::find_by_sub_unit(self.pool.inner(), sub_unit_id.into_inner())
            .await
            .map_err(DbError::from)?;
        Ok(rows.into_iter().map(Admin::from).collect())
    }

    async fn find_by_organization(&self, organization_id: OrganizationId) -> Result<Vec<Admin>> {
        let rows = AdminRow::find_org_wide(self.pool.inner(), organization_id.into_inner())
            .await
            .map_err(DbError::from)?;
        Ok(rows.into_iter().map(Admin::from).collect())
    }

    async fn find_by_id(&self, admin_id: AdminId) -> Result<Option<Admin>> {
        let row = sqlx::query_as::<_, AdminRow>(
            r"
            SELECT id, organization_id, sub_unit_id, name, role, created_at
            FROM admins
            WHERE id = $1
            ",
        )
        .bind(admin_id.into_inner())
        .fetch_optional(self.pool.inner())
        .await
        .map_err(DbError::from)?;
        Ok(row.map(Admin::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_row_without_school_is_district_wide() {
        let row = AdminRow {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            sub_unit_id: None,
            name: "Superintendent Hale".to_string(),
            role: "Admin".to_string(),
            created_at: Utc::now(),
        };
        let admin = Admin::from(row.clone());
        assert_eq!(admin.id.into_inner(), row.id);
        assert_eq!(admin.sub_unit_id, None);
    }
}
