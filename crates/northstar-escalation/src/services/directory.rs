//! Ownership hierarchy and administrator directory.
//!
//! Districts, schools, students and administrators are managed elsewhere; the
//! engine only reads them to scope lookups and pick notification recipients.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use northstar_core::{AdminId, OrganizationId, StudentId, SubUnitId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::Result;

// ============================================================================
// Domain Types
// ============================================================================

/// A school within a district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubUnit {
    pub id: SubUnitId,
    pub organization_id: OrganizationId,
    pub name: String,
}

/// A student enrolled at one school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub organization_id: OrganizationId,
    pub sub_unit_id: SubUnitId,
    pub first_name: String,
    pub last_name: String,
}

impl Student {
    /// Name used in notification messages.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// An administrator who may receive escalation notifications.
///
/// `sub_unit_id` is `None` for district-wide administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    pub id: AdminId,
    pub organization_id: OrganizationId,
    pub sub_unit_id: Option<SubUnitId>,
    pub name: String,
    /// Role tag, e.g. "Admin" or "Counselor".
    pub role: String,
}

// ============================================================================
// Directory Traits
// ============================================================================

/// Read access to the district/school/student hierarchy.
#[async_trait::async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Whether the district exists.
    async fn organization_exists(&self, organization_id: OrganizationId) -> Result<bool>;

    /// Look up a school by id.
    async fn find_sub_unit(&self, sub_unit_id: SubUnitId) -> Result<Option<SubUnit>>;

    /// Look up a student by id.
    async fn find_student(&self, student_id: StudentId) -> Result<Option<Student>>;
}

/// Read access to administrators.
#[async_trait::async_trait]
pub trait AdminDirectory: Send + Sync {
    /// Administrators assigned to one school.
    async fn find_by_sub_unit(&self, sub_unit_id: SubUnitId) -> Result<Vec<Admin>>;

    /// District-wide administrators, i.e. those without a school.
    async fn find_by_organization(&self, organization_id: OrganizationId) -> Result<Vec<Admin>>;

    /// Look up an administrator by id.
    async fn find_by_id(&self, admin_id: AdminId) -> Result<Option<Admin>>;
}

// ============================================================================
// In-Memory Directory (for testing)
// ============================================================================

/// In-memory directory implementing both [`TenantDirectory`] and
/// [`AdminDirectory`].
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    organizations: Arc<RwLock<HashSet<OrganizationId>>>,
    sub_units: Arc<RwLock<HashMap<SubUnitId, SubUnit>>>,
    students: Arc<RwLock<HashMap<StudentId, Student>>>,
    admins: Arc<RwLock<HashMap<AdminId, Admin>>>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a district.
    pub async fn add_organization(&self, organization_id: OrganizationId) {
        self.organizations.write().await.insert(organization_id);
    }

    /// Register a school. Its district is registered too.
    pub async fn add_sub_unit(&self, sub_unit: SubUnit) {
        self.add_organization(sub_unit.organization_id).await;
        self.sub_units.write().await.insert(sub_unit.id, sub_unit);
    }

    /// Register a student.
    pub async fn add_student(&self, student: Student) {
        self.students.write().await.insert(student.id, student);
    }

    /// Register an administrator.
    pub async fn add_admin(&self, admin: Admin) {
        self.admins.write().await.insert(admin.id, admin);
    }

    /// Clear all data.
    pub async fn clear(&self) {
        self.organizations.write().await.clear();
        self.sub_units.write().await.clear();
        self.students.write().await.clear();
        self.admins.write().await.clear();
    }
}

#[async_trait::async_trait]
impl TenantDirectory for InMemoryDirectory {
    async fn organization_exists(&self, organization_id: OrganizationId) -> Result<bool> {
        Ok(self.organizations.read().await.contains(&organization_id))
    }

    async fn find_sub_unit(&self, sub_unit_id: SubUnitId) -> Result<Option<SubUnit>> {
        Ok(self.sub_units.read().await.get(&sub_unit_id).cloned())
    }

    async fn find_student(&self, student_id: StudentId) -> Result<Option<Student>> {
        Ok(self.students.read().await.get(&student_id).cloned())
    }
}

#[async_trait::async_trait]
impl AdminDirectory for InMemoryDirectory {
    async fn find_by_sub_unit(&self, sub_unit_id: SubUnitId) -> Result<Vec<Admin>> {
        let admins = self.admins.read().await;
        let mut found: Vec<Admin> = admins
            .values()
            .filter(|a| a.sub_unit_id == Some(sub_unit_id))
            .cloned()
            .collect();
        found.sort_by_key(|a| a.id);
        Ok(found)
    }

    async fn find_by_organization(&self, organization_id: OrganizationId) -> Result<Vec<Admin>> {
        let admins = self.admins.read().await;
        let mut found: Vec<Admin> = admins
            .values()
            .filter(|a| a.organization_id == organization_id && a.sub_unit_id.is_none())
            .cloned()
            .collect();
        found.sort_by_key(|a| a.id);
        Ok(found)
    }

    async fn find_by_id(&self, admin_id: AdminId) -> Result<Option<Admin>> {
        Ok(self.admins.read().await.get(&admin_id).cloned())
    }
}
