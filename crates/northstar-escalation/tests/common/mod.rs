//! Common test utilities for northstar-escalation integration tests.
//!
//! Every test gets its own in-memory stores and two districts: district A
//! with two schools and district B with one.

#![allow(dead_code)]

pub mod fixtures;

use std::collections::HashSet;
use std::sync::{Arc, Once};

use chrono::{DateTime, Utc};
use northstar_core::{AdminId, NotificationId, OrganizationId, StudentId, SubUnitId};
use northstar_escalation::services::notification::NotificationKey;
use northstar_escalation::{
    Admin, EngineConfig, EngineStores, EscalationEngine, EscalationError, InMemoryDirectory,
    InMemoryIncidentStore, InMemoryNotificationStore, InMemoryRuleStore, Incident,
    IncidentStore, Notification, NotificationStore, Result, Student, SubUnit,
};
use northstar_tenant::TenantContext;
use tokio::sync::RwLock;

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

/// All in-memory stores for test isolation.
#[derive(Clone)]
pub struct TestStores {
    pub directory: Arc<InMemoryDirectory>,
    pub rules: Arc<InMemoryRuleStore>,
    pub incidents: Arc<InMemoryIncidentStore>,
    pub notifications: Arc<InMemoryNotificationStore>,
}

impl TestStores {
    /// Create a new set of isolated test stores.
    pub fn new() -> Self {
        Self {
            directory: Arc::new(InMemoryDirectory::new()),
            rules: Arc::new(InMemoryRuleStore::new()),
            incidents: Arc::new(InMemoryIncidentStore::new()),
            notifications: Arc::new(InMemoryNotificationStore::new()),
        }
    }

    /// Engine wiring over these stores.
    pub fn engine_stores(&self) -> EngineStores {
        self.engine_stores_with(self.notifications.clone())
    }

    /// Engine wiring with a replacement notification store.
    pub fn engine_stores_with(&self, notifications: Arc<dyn NotificationStore>) -> EngineStores {
        EngineStores {
            directory: self.directory.clone(),
            admins: self.directory.clone(),
            rules: self.rules.clone(),
            incidents: self.incidents.clone(),
            notifications,
        }
    }
}

impl Default for TestStores {
    fn default() -> Self {
        Self::new()
    }
}

/// Test context containing stores, the engine, and two districts.
pub struct TestContext {
    pub stores: TestStores,
    pub engine: Arc<EscalationEngine>,
    pub district_a: OrganizationId,
    pub school_a1: SubUnitId,
    pub school_a2: SubUnitId,
    pub district_b: OrganizationId,
    pub school_b1: SubUnitId,
}

impl TestContext {
    /// Create a new isolated test context.
    pub async fn new() -> Self {
        let stores = TestStores::new();
        let engine = Arc::new(EscalationEngine::new(
            stores.engine_stores(),
            EngineConfig::default(),
        ));
        Self::with_engine(stores, engine).await
    }

    /// Create a context with a custom engine configuration.
    pub async fn with_config(config: EngineConfig) -> Self {
        let stores = TestStores::new();
        let engine = Arc::new(EscalationEngine::new(stores.engine_stores(), config));
        Self::with_engine(stores, engine).await
    }

    /// Create a context whose engine writes notifications through `notifications`.
    pub async fn with_notification_store(notifications: Arc<dyn NotificationStore>) -> Self {
        let stores = TestStores::new();
        let engine = Arc::new(EscalationEngine::new(
            stores.engine_stores_with(notifications),
            EngineConfig::default(),
        ));
        Self::with_engine(stores, engine).await
    }

    async fn with_engine(stores: TestStores, engine: Arc<EscalationEngine>) -> Self {
        init_test_logging();

        let ctx = Self {
            stores,
            engine,
            district_a: OrganizationId::new(),
            school_a1: SubUnitId::new(),
            school_a2: SubUnitId::new(),
            district_b: OrganizationId::new(),
            school_b1: SubUnitId::new(),
        };

        for (id, organization_id, name) in [
            (ctx.school_a1, ctx.district_a, "Lincoln Elementary"),
            (ctx.school_a2, ctx.district_a, "Roosevelt Middle"),
            (ctx.school_b1, ctx.district_b, "Jefferson High"),
        ] {
            ctx.stores
                .directory
                .add_sub_unit(SubUnit {
                    id,
                    organization_id,
                    name: name.to_string(),
                })
                .await;
        }
        ctx
    }

    /// District-wide context for district A.
    pub fn tenant_a(&self) -> TenantContext {
        TenantContext::new(self.district_a)
    }

    /// School-scoped context in district A.
    pub fn school_tenant(&self, school: SubUnitId) -> TenantContext {
        TenantContext::for_sub_unit(self.district_a, school)
    }

    /// District-wide context for district B.
    pub fn tenant_b(&self) -> TenantContext {
        TenantContext::new(self.district_b)
    }

    /// Register a student at `school` in district A.
    pub async fn add_student(&self, school: SubUnitId, first: &str, last: &str) -> Student {
        self.add_student_in(self.district_a, school, first, last).await
    }

    /// Register a student in any district.
    pub async fn add_student_in(
        &self,
        district: OrganizationId,
        school: SubUnitId,
        first: &str,
        last: &str,
    ) -> Student {
        let student = fixtures::student(district, school, first, last);
        self.stores.directory.add_student(student.clone()).await;
        student
    }

    /// Register an administrator in district A. `school = None` is district-wide.
    pub async fn add_admin(&self, school: Option<SubUnitId>, name: &str) -> Admin {
        self.add_admin_in(self.district_a, school, name).await
    }

    /// Register an administrator in any district.
    pub async fn add_admin_in(
        &self,
        district: OrganizationId,
        school: Option<SubUnitId>,
        name: &str,
    ) -> Admin {
        let admin = fixtures::admin(district, school, name);
        self.stores.directory.add_admin(admin.clone()).await;
        admin
    }

    /// Store an incident directly, without an escalation pass.
    pub async fn seed_incident(
        &self,
        student: &Student,
        category: &str,
        occurred_at: DateTime<Utc>,
    ) -> Incident {
        self.seed_incident_with_severity(student, category, "minor", occurred_at)
            .await
    }

    /// Store an incident with a given severity, without an escalation pass.
    pub async fn seed_incident_with_severity(
        &self,
        student: &Student,
        category: &str,
        severity: &str,
        occurred_at: DateTime<Utc>,
    ) -> Incident {
        self.stores
            .incidents
            .create(fixtures::incident(student, category, severity, occurred_at))
            .await
            .expect("Failed to seed incident")
    }

    /// Notifications stored for one student, in no particular order.
    pub async fn notifications_for_student(&self, student_id: StudentId) -> Vec<Notification> {
        let incidents = self
            .stores
            .incidents
            .find_by_student_ordered_by_occurrence_desc(student_id)
            .await
            .expect("Failed to list incidents");
        let mut found = Vec::new();
        for incident in incidents {
            found.extend(self.stores.notifications.list_for_incident(incident.id).await);
        }
        found
    }
}

// ============================================================================
// Failing notification store
// ============================================================================

/// Notification store that rejects writes for selected administrators and
/// delegates everything else to an in-memory store.
#[derive(Default)]
pub struct FlakyNotificationStore {
    pub inner: InMemoryNotificationStore,
    failing: RwLock<HashSet<AdminId>>,
}

impl FlakyNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write for `admin_id` fail.
    pub async fn fail_for(&self, admin_id: AdminId) {
        self.failing.write().await.insert(admin_id);
    }

    /// Stop failing writes for `admin_id`.
    pub async fn recover(&self, admin_id: AdminId) {
        self.failing.write().await.remove(&admin_id);
    }
}

#[async_trait::async_trait]
impl NotificationStore for FlakyNotificationStore {
    async fn exists_for(&self, key: NotificationKey) -> Result<bool> {
        self.inner.exists_for(key).await
    }

    async fn create(&self, notification: Notification) -> Result<Option<Notification>> {
        if self.failing.read().await.contains(&notification.admin_id) {
            return Err(EscalationError::store("connection reset"));
        }
        self.inner.create(notification).await
    }

    async fn find_unread_for_admin(&self, admin_id: AdminId) -> Result<Vec<Notification>> {
        self.inner.find_unread_for_admin(admin_id).await
    }

    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>> {
        self.inner.find_by_id(id).await
    }

    async fn mark_read(&self, id: NotificationId) -> Result<Option<Notification>> {
        self.inner.mark_read(id).await
    }
}
