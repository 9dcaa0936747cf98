//! Administrator notification storage.
//!
//! At most one notification exists per (incident, rule, recipient). The
//! store's `create` enforces this atomically so concurrent escalation passes
//! for the same incident cannot produce duplicates.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use northstar_core::{
    AdminId, EscalationRuleId, IncidentId, NotificationId, OrganizationId, StudentId, SubUnitId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::Result;

// ============================================================================
// Domain Types
// ============================================================================

/// An escalation notice addressed to one administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub organization_id: OrganizationId,
    pub sub_unit_id: Option<SubUnitId>,
    pub admin_id: AdminId,
    pub student_id: StudentId,
    pub incident_id: IncidentId,
    /// `None` when the system default rule fired.
    pub rule_id: Option<EscalationRuleId>,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Uniqueness key of this notification.
    #[must_use]
    pub fn key(&self) -> NotificationKey {
        NotificationKey {
            incident_id: self.incident_id,
            rule_id: self.rule_id,
            admin_id: self.admin_id,
        }
    }
}

/// The (incident, rule, recipient) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationKey {
    pub incident_id: IncidentId,
    pub rule_id: Option<EscalationRuleId>,
    pub admin_id: AdminId,
}

// ============================================================================
// Store Trait
// ============================================================================

/// Trait for notification storage backends.
#[async_trait::async_trait]
pub trait NotificationStore: Send + Sync {
    /// Whether a notification with this key already exists.
    async fn exists_for(&self, key: NotificationKey) -> Result<bool>;

    /// Insert unless the key already exists.
    ///
    /// Returns `None` when a notification with the same key was already
    /// stored. The check and the insert are one atomic step.
    async fn create(&self, notification: Notification) -> Result<Option<Notification>>;

    /// Unread notifications for an administrator, newest first.
    async fn find_unread_for_admin(&self, admin_id: AdminId) -> Result<Vec<Notification>>;

    /// Look up a notification by id.
    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>>;

    /// Flip the read flag. Returns the updated notification, or `None` if it
    /// does not exist.
    async fn mark_read(&self, id: NotificationId) -> Result<Option<Notification>>;
}

// ============================================================================
// In-Memory Store (for testing)
// ============================================================================

#[derive(Debug, Default)]
struct NotificationTable {
    rows: HashMap<NotificationId, Notification>,
    keys: HashMap<NotificationKey, NotificationId>,
}

/// In-memory notification store for testing.
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    table: Arc<RwLock<NotificationTable>>,
}

impl InMemoryNotificationStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get notification count.
    pub async fn count(&self) -> usize {
        self.table.read().await.rows.len()
    }

    /// All notifications for an incident, in no particular order.
    pub async fn list_for_incident(&self, incident_id: IncidentId) -> Vec<Notification> {
        self.table
            .read()
            .await
            .rows
            .values()
            .filter(|n| n.incident_id == incident_id)
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn exists_for(&self, key: NotificationKey) -> Result<bool> {
        Ok(self.table.read().await.keys.contains_key(&key))
    }

    async fn create(&self, notification: Notification) -> Result<Option<Notification>> {
        let mut table = self.table.write().await;
        let key = notification.key();
        if table.keys.contains_key(&key) {
            return Ok(None);
        }
        table.keys.insert(key, notification.id);
        table.rows.insert(notification.id, notification.clone());
        Ok(Some(notification))
    }

    async fn find_unread_for_admin(&self, admin_id: AdminId) -> Result<Vec<Notification>> {
        let table = self.table.read().await;
        let mut found: Vec<Notification> = table
            .rows
            .values()
            .filter(|n| n.admin_id == admin_id && !n.read)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn mark_read(&self, id: NotificationId) -> Result<Option<Notification>> {
        let mut table = self.table.write().await;
        Ok(table.rows.get_mut(&id).map(|n| {
            n.read = true;
            n.clone()
        }))
    }
}
