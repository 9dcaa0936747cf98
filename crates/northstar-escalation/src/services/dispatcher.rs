//! Notification fan-out to administrators in a rule's scope.

use std::sync::Arc;

use chrono::Utc;
use northstar_core::{AdminId, NotificationId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EscalationError, Result};
use crate::services::directory::{Admin, AdminDirectory};
use crate::services::incidents::Incident;
use crate::services::notification::{Notification, NotificationKey, NotificationStore};
use crate::services::rules::EscalationRule;

// ============================================================================
// Report Types
// ============================================================================

/// What happened for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecipientOutcome {
    /// A new notification was stored.
    Created { notification_id: NotificationId },
    /// The (incident, rule, recipient) triple already had a notification.
    AlreadyNotified,
    /// The store rejected the write.
    Failed { error: String },
}

/// Per-recipient outcomes of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub outcomes: Vec<(AdminId, RecipientOutcome)>,
}

impl DispatchReport {
    /// Recipients the dispatcher tried.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Notifications newly created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, RecipientOutcome::Created { .. }))
    }

    /// Recipients skipped because they were already notified.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RecipientOutcome::AlreadyNotified))
    }

    /// Recipients whose notification could not be written.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RecipientOutcome::Failed { .. }))
    }

    /// The aggregate failure, if any recipient failed.
    #[must_use]
    pub fn failure(&self) -> Option<EscalationError> {
        let failed = self.failed();
        (failed > 0).then(|| EscalationError::PartialDispatchFailure {
            attempted: self.attempted(),
            failed,
        })
    }

    fn count(&self, pred: impl Fn(&RecipientOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

// ============================================================================
// Service
// ============================================================================

/// Creates one notification per administrator in a rule's scope.
pub struct NotificationDispatcher {
    admins: Arc<dyn AdminDirectory>,
    notifications: Arc<dyn NotificationStore>,
}

impl NotificationDispatcher {
    /// Create a new dispatcher.
    pub fn new(admins: Arc<dyn AdminDirectory>, notifications: Arc<dyn NotificationStore>) -> Self {
        Self {
            admins,
            notifications,
        }
    }

    /// Administrators who receive notifications for `rule`.
    ///
    /// A school rule reaches that school's administrators. A district rule,
    /// including the system default, reaches district-wide administrators.
    pub async fn recipients(&self, rule: &EscalationRule) -> Result<Vec<Admin>> {
        match rule.sub_unit_id {
            Some(sub_unit_id) => self.admins.find_by_sub_unit(sub_unit_id).await,
            None => self.admins.find_by_organization(rule.organization_id).await,
        }
    }

    /// Notify every recipient of `rule` about `incident`.
    ///
    /// Fails only if the recipient list cannot be read. Individual write
    /// failures are recorded in the report and do not stop the others.
    pub async fn dispatch(
        &self,
        incident: &Incident,
        rule: &EscalationRule,
        message: &str,
    ) -> Result<DispatchReport> {
        let recipients = self.recipients(rule).await?;
        let mut report = DispatchReport::default();

        for admin in recipients {
            let outcome = self.notify(incident, rule, &admin, message).await;
            if let RecipientOutcome::Failed { error } = &outcome {
                warn!(
                    incident_id = %incident.id,
                    admin_id = %admin.id,
                    error = %error,
                    "Failed to create notification"
                );
            }
            report.outcomes.push((admin.id, outcome));
        }

        debug!(
            incident_id = %incident.id,
            rule_id = ?rule.id,
            attempted = report.attempted(),
            created = report.created(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Dispatched notifications"
        );
        Ok(report)
    }

    async fn notify(
        &self,
        incident: &Incident,
        rule: &EscalationRule,
        admin: &Admin,
        message: &str,
    ) -> RecipientOutcome {
        let key = NotificationKey {
            incident_id: incident.id,
            rule_id: rule.id,
            admin_id: admin.id,
        };

        match self.notifications.exists_for(key).await {
            Ok(true) => return RecipientOutcome::AlreadyNotified,
            Ok(false) => {}
            Err(e) => {
                return RecipientOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }

        let notification = Notification {
            id: NotificationId::new(),
            organization_id: incident.organization_id,
            sub_unit_id: Some(incident.sub_unit_id),
            admin_id: admin.id,
            student_id: incident.student_id,
            incident_id: incident.id,
            rule_id: rule.id,
            message: message.to_string(),
            read: false,
            created_at: Utc::now(),
        };

        match self.notifications.create(notification).await {
            Ok(Some(created)) => RecipientOutcome::Created {
                notification_id: created.id,
            },
            Ok(None) => RecipientOutcome::AlreadyNotified,
            Err(e) => RecipientOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::directory::InMemoryDirectory;
    use crate::services::notification::InMemoryNotificationStore;
    use northstar_core::{EscalationRuleId, IncidentId, OrganizationId, StudentId, SubUnitId};

    fn admin(org: OrganizationId, sub: Option<SubUnitId>) -> Admin {
        Admin {
            id: AdminId::new(),
            organization_id: org,
            sub_unit_id: sub,
            name: "Jordan Park".to_string(),
            role: "Admin".to_string(),
        }
    }

    fn incident(org: OrganizationId, sub: SubUnitId) -> Incident {
        let now = Utc::now();
        Incident {
            id: IncidentId::new(),
            organization_id: org,
            sub_unit_id: sub,
            student_id: StudentId::new(),
            category: "Disruption".to_string(),
            severity: "minor".to_string(),
            description: None,
            reported_by: "Ms. Rivera".to_string(),
            occurred_at: now,
            created_at: now,
        }
    }

    #[test]
    fn test_report_counts() {
        let report = DispatchReport {
            outcomes: vec![
                (
                    AdminId::new(),
                    RecipientOutcome::Created {
                        notification_id: NotificationId::new(),
                    },
                ),
                (AdminId::new(), RecipientOutcome::AlreadyNotified),
                (
                    AdminId::new(),
                    RecipientOutcome::Failed {
                        error: "boom".to_string(),
                    },
                ),
            ],
        };
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.created(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.failure(),
            Some(EscalationError::PartialDispatchFailure {
                attempted: 3,
                failed: 1,
            })
        );
        assert_eq!(DispatchReport::default().failure(), None);
    }

    #[tokio::test]
    async fn test_dispatch_twice_creates_once() {
        let directory = Arc::new(InMemoryDirectory::new());
        let store = Arc::new(InMemoryNotificationStore::new());
        let org = OrganizationId::new();
        let school = SubUnitId::new();
        directory.add_admin(admin(org, Some(school))).await;
        directory.add_admin(admin(org, Some(school))).await;
        directory.add_admin(admin(org, None)).await;

        let dispatcher = NotificationDispatcher::new(directory, store.clone());
        let mut rule = EscalationRule::system_default(org);
        rule.id = Some(EscalationRuleId::new());
        rule.sub_unit_id = Some(school);
        let incident = incident(org, school);

        let first = dispatcher.dispatch(&incident, &rule, "msg").await.unwrap();
        assert_eq!(first.created(), 2);

        let second = dispatcher.dispatch(&incident, &rule, "msg").await.unwrap();
        assert_eq!(second.created(), 0);
        assert_eq!(second.skipped(), 2);
        assert_eq!(store.count().await, 2);
    }

    #[tokio::test]
    async fn test_system_default_reaches_district_admins() {
        let directory = Arc::new(InMemoryDirectory::new());
        let store = Arc::new(InMemoryNotificationStore::new());
        let org = OrganizationId::new();
        let school = SubUnitId::new();
        let district_admin = admin(org, None);
        directory.add_admin(district_admin.clone()).await;
        directory.add_admin(admin(org, Some(school))).await;

        let dispatcher = NotificationDispatcher::new(directory, store.clone());
        let rule = EscalationRule::system_default(org);
        let incident = incident(org, school);

        let report = dispatcher.dispatch(&incident, &rule, "msg").await.unwrap();
        assert_eq!(report.created(), 1);
        assert_eq!(report.outcomes[0].0, district_admin.id);

        let stored = store.list_for_incident(incident.id).await;
        assert_eq!(stored[0].rule_id, None);
    }
}
