//! Tenant-checked entry points of the escalation engine.
//!
//! Every operation takes the caller's [`TenantContext`] explicitly. A missing
//! context fails with [`EscalationError::Unauthenticated`] before any store is
//! read, and entities outside the caller's tenant are reported as not found.

use std::sync::Arc;

use chrono::Utc;
use northstar_core::{AdminId, IncidentId, NotificationId, SubUnitId};
use northstar_tenant::TenantContext;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::config::EngineConfig;
use crate::error::{EscalationError, Result};
use crate::services::directory::{AdminDirectory, TenantDirectory};
use crate::services::dispatcher::{DispatchReport, NotificationDispatcher};
use crate::services::evaluator::{EscalationDecision, EscalationEvaluator};
use crate::services::incidents::{Incident, IncidentStore, IncidentWindowCounter, NewIncident};
use crate::services::notification::{Notification, NotificationStore};
use crate::services::rules::{EscalationRule, RuleResolver, RuleStore};
use crate::types::RuleSettingsInput;

/// Storage backends used by the engine.
#[derive(Clone)]
pub struct EngineStores {
    pub directory: Arc<dyn TenantDirectory>,
    pub admins: Arc<dyn AdminDirectory>,
    pub rules: Arc<dyn RuleStore>,
    pub incidents: Arc<dyn IncidentStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

/// Result of one escalation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EscalationOutcome {
    /// No threshold was crossed.
    NotEscalated { decision: EscalationDecision },
    /// At least one threshold was crossed and recipients were notified.
    Escalated {
        decision: EscalationDecision,
        report: DispatchReport,
    },
}

impl EscalationOutcome {
    /// Whether the pass escalated.
    #[must_use]
    pub fn is_escalated(&self) -> bool {
        matches!(self, Self::Escalated { .. })
    }

    /// The evaluation behind this outcome.
    #[must_use]
    pub fn decision(&self) -> &EscalationDecision {
        match self {
            Self::NotEscalated { decision } | Self::Escalated { decision, .. } => decision,
        }
    }

    /// The dispatch report, if the pass escalated.
    #[must_use]
    pub fn report(&self) -> Option<&DispatchReport> {
        match self {
            Self::NotEscalated { .. } => None,
            Self::Escalated { report, .. } => Some(report),
        }
    }
}

/// A persisted incident together with its escalation pass.
#[derive(Debug, Clone)]
pub struct RecordedIncident {
    pub incident: Incident,
    /// `None` when the escalation pass failed; the failure is logged.
    pub escalation: Option<EscalationOutcome>,
}

fn require_tenant(tenant: Option<&TenantContext>) -> Result<TenantContext> {
    tenant.copied().ok_or(EscalationError::Unauthenticated)
}

/// Facade over rule resolution, evaluation and dispatch.
pub struct EscalationEngine {
    directory: Arc<dyn TenantDirectory>,
    admins: Arc<dyn AdminDirectory>,
    incidents: Arc<dyn IncidentStore>,
    notifications: Arc<dyn NotificationStore>,
    resolver: Arc<RuleResolver>,
    evaluator: EscalationEvaluator,
    dispatcher: NotificationDispatcher,
}

impl EscalationEngine {
    /// Wire the engine over the given stores.
    pub fn new(stores: EngineStores, config: EngineConfig) -> Self {
        let resolver = Arc::new(RuleResolver::new(
            Arc::clone(&stores.rules),
            Arc::clone(&stores.directory),
        ));
        let counter =
            IncidentWindowCounter::new(Arc::clone(&stores.incidents), config.major_severity);
        let evaluator = EscalationEvaluator::new(
            Arc::clone(&resolver),
            counter,
            Arc::clone(&stores.directory),
        );
        let dispatcher =
            NotificationDispatcher::new(Arc::clone(&stores.admins), Arc::clone(&stores.notifications));

        Self {
            directory: stores.directory,
            admins: stores.admins,
            incidents: stores.incidents,
            notifications: stores.notifications,
            resolver,
            evaluator,
            dispatcher,
        }
    }

    // ------------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------------

    /// Effective rule for the caller's district.
    ///
    /// `sub_unit_id` defaults to the caller's school when not given.
    pub async fn resolve_rule(
        &self,
        tenant: Option<&TenantContext>,
        sub_unit_id: Option<SubUnitId>,
    ) -> Result<EscalationRule> {
        let ctx = require_tenant(tenant)?;
        let sub_unit_id = sub_unit_id.or(ctx.sub_unit_id());
        if !ctx.can_access(ctx.organization_id(), sub_unit_id) {
            return Err(EscalationError::not_found(
                "SubUnit",
                sub_unit_id.map(|s| s.to_string()).unwrap_or_default(),
            ));
        }
        self.resolver.resolve(ctx.organization_id(), sub_unit_id).await
    }

    /// Configure the district rule (`sub_unit_id = None`) or a school override.
    #[instrument(skip(self, tenant, input))]
    pub async fn upsert_rule(
        &self,
        tenant: Option<&TenantContext>,
        sub_unit_id: Option<SubUnitId>,
        input: RuleSettingsInput,
    ) -> Result<EscalationRule> {
        let ctx = require_tenant(tenant)?;
        if !ctx.can_access(ctx.organization_id(), sub_unit_id) {
            return Err(EscalationError::not_found(
                "SubUnit",
                sub_unit_id.map(|s| s.to_string()).unwrap_or_default(),
            ));
        }
        let rule = self
            .resolver
            .upsert(ctx.organization_id(), sub_unit_id, input)
            .await?;
        info!(
            organization_id = %ctx.organization_id(),
            rule_id = ?rule.id,
            "Escalation rule configured"
        );
        Ok(rule)
    }

    // ------------------------------------------------------------------------
    // Incidents
    // ------------------------------------------------------------------------

    /// Persist an incident, then run its escalation pass.
    ///
    /// Once the incident is stored this succeeds regardless of the pass.
    #[instrument(skip(self, tenant, input), fields(student_id = %input.student_id))]
    pub async fn record_incident(
        &self,
        tenant: Option<&TenantContext>,
        input: NewIncident,
    ) -> Result<RecordedIncident> {
        let ctx = require_tenant(tenant)?;
        input.validate()?;

        let student = self
            .directory
            .find_student(input.student_id)
            .await?
            .filter(|s| ctx.can_access(s.organization_id, Some(s.sub_unit_id)))
            .ok_or_else(|| EscalationError::not_found("Student", input.student_id))?;

        let now = Utc::now();
        let incident = self
            .incidents
            .create(Incident {
                id: IncidentId::new(),
                organization_id: student.organization_id,
                sub_unit_id: student.sub_unit_id,
                student_id: student.id,
                category: input.category.trim().to_string(),
                severity: input.severity.trim().to_string(),
                description: input.description,
                reported_by: input.reported_by,
                occurred_at: input.occurred_at.unwrap_or(now),
                created_at: now,
            })
            .await?;

        let escalation = match self.on_incident_created(Some(&ctx), &incident).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(
                    incident_id = %incident.id,
                    error = %e,
                    "Escalation pass failed; incident kept"
                );
                None
            }
        };

        Ok(RecordedIncident {
            incident,
            escalation,
        })
    }

    /// Escalation pass for an incident that is already persisted.
    ///
    /// The rule lookup, the window count and the notification writes do not
    /// share one transaction, so a concurrent incident or rule change can
    /// land between them. Repeated or concurrent passes for the same
    /// incident cannot produce duplicate notifications: each one is keyed
    /// by (incident, rule, recipient) and inserted atomically, and an
    /// existing key is skipped.
    #[instrument(skip(self, tenant, incident), fields(incident_id = %incident.id))]
    pub async fn on_incident_created(
        &self,
        tenant: Option<&TenantContext>,
        incident: &Incident,
    ) -> Result<EscalationOutcome> {
        let ctx = require_tenant(tenant)?;
        if !ctx.can_access(incident.organization_id, Some(incident.sub_unit_id)) {
            return Err(EscalationError::not_found("Incident", incident.id));
        }

        let decision = self.evaluator.evaluate(incident).await?;
        let Some(message) = decision.combined_message() else {
            return Ok(EscalationOutcome::NotEscalated { decision });
        };

        let report = self
            .dispatcher
            .dispatch(incident, &decision.rule, &message)
            .await?;

        info!(
            incident_id = %incident.id,
            student_id = %incident.student_id,
            rule_source = %decision.rule.source(),
            tier = ?decision.highest_tier(),
            created = report.created(),
            "Incident escalated"
        );
        if let Some(failure) = report.failure() {
            warn!(incident_id = %incident.id, error = %failure, "Escalation partially dispatched");
        }

        Ok(EscalationOutcome::Escalated { decision, report })
    }

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    /// Unread notifications for an administrator, newest first.
    pub async fn get_unread_notifications(
        &self,
        tenant: Option<&TenantContext>,
        admin_id: AdminId,
    ) -> Result<Vec<Notification>> {
        let ctx = require_tenant(tenant)?;
        let admin = self
            .admins
            .find_by_id(admin_id)
            .await?
            .filter(|a| ctx.can_access(a.organization_id, a.sub_unit_id))
            .ok_or_else(|| EscalationError::not_found("Admin", admin_id))?;

        let notifications = self.notifications.find_unread_for_admin(admin.id).await?;
        Ok(notifications
            .into_iter()
            .filter(|n| n.organization_id == ctx.organization_id())
            .collect())
    }

    /// Mark one of the administrator's notifications as read.
    ///
    /// A notification addressed to someone else is reported as not found.
    pub async fn mark_notification_read(
        &self,
        tenant: Option<&TenantContext>,
        admin_id: AdminId,
        notification_id: NotificationId,
    ) -> Result<Notification> {
        let ctx = require_tenant(tenant)?;
        let not_found = || EscalationError::not_found("Notification", notification_id);

        self.notifications
            .find_by_id(notification_id)
            .await?
            .filter(|n| n.admin_id == admin_id)
            .filter(|n| ctx.can_access(n.organization_id, n.sub_unit_id))
            .ok_or_else(not_found)?;

        self.notifications
            .mark_read(notification_id)
            .await?
            .ok_or_else(not_found)
    }
}
