//! Threshold evaluation for newly recorded incidents.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EscalationError, Result};
use crate::services::directory::TenantDirectory;
use crate::services::incidents::{Incident, IncidentWindowCounter, WindowTally};
use crate::services::rules::{EscalationRule, RuleResolver};
use crate::types::{EscalationTier, EscalationTrigger, RuleSettings};

// ============================================================================
// Decision Types
// ============================================================================

/// One threshold crossed by an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationEvent {
    pub trigger: EscalationTrigger,
    pub tier: EscalationTier,
    pub tier_label: String,
    pub threshold: u32,
    /// Count that reached the threshold.
    pub count: u32,
    pub message: String,
}

/// Outcome of evaluating one incident against its effective rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationDecision {
    pub rule: EscalationRule,
    pub tally: WindowTally,
    /// Fired triggers in [`EscalationTrigger::ALL`] order. Empty when
    /// nothing escalates.
    pub events: Vec<EscalationEvent>,
    /// Requirement notes appended to the notification text.
    pub notes: Vec<String>,
}

impl EscalationDecision {
    /// Whether any threshold was crossed.
    #[must_use]
    pub fn fires(&self) -> bool {
        !self.events.is_empty()
    }

    /// Highest tier reached, if any.
    #[must_use]
    pub fn highest_tier(&self) -> Option<EscalationTier> {
        self.events.iter().map(|e| e.tier).max()
    }

    /// Single notification text covering every fired event.
    #[must_use]
    pub fn combined_message(&self) -> Option<String> {
        if !self.fires() {
            return None;
        }
        let parts: Vec<&str> = self
            .events
            .iter()
            .map(|e| e.message.as_str())
            .chain(self.notes.iter().map(String::as_str))
            .collect();
        Some(parts.join(" "))
    }
}

/// Build the message for one fired trigger.
///
/// The text is deterministic in the student name, tier label, threshold,
/// window length and triggering category.
#[must_use]
pub fn event_message(
    student_name: &str,
    tier_label: &str,
    trigger: EscalationTrigger,
    threshold: u32,
    window_days: u32,
    category: &str,
) -> String {
    let counted = match trigger {
        EscalationTrigger::SameCategory | EscalationTrigger::Tier2SameCategory => {
            "same-category incidents"
        }
        EscalationTrigger::MixedCategory => "incidents",
        EscalationTrigger::MajorToTier2 | EscalationTrigger::MajorToTier3 => "major incidents",
    };
    format!(
        "Student {student_name} has reached the threshold for {tier_label} \
         ({threshold} {counted} in {window_days} days). Last incident: {category}."
    )
}

fn requirement_notes(settings: &RuleSettings) -> Vec<String> {
    let mut notes = Vec::new();
    if settings.require_parent_contact {
        notes.push("Parent contact required.".to_string());
    }
    if settings.require_admin_approval {
        notes.push("Admin approval required.".to_string());
    }
    notes
}

fn counter_for(trigger: EscalationTrigger, tally: &WindowTally) -> u32 {
    match trigger {
        EscalationTrigger::SameCategory | EscalationTrigger::Tier2SameCategory => {
            tally.same_category
        }
        EscalationTrigger::MixedCategory => tally.mixed,
        EscalationTrigger::MajorToTier2 | EscalationTrigger::MajorToTier3 => tally.major,
    }
}

/// Decide which triggers fire for a tally under a rule.
#[must_use]
pub fn decide(
    rule: EscalationRule,
    tally: WindowTally,
    student_name: &str,
    category: &str,
) -> EscalationDecision {
    let settings = &rule.settings;
    let events = EscalationTrigger::ALL
        .into_iter()
        .filter_map(|trigger| {
            let threshold = trigger.threshold(settings);
            let count = counter_for(trigger, &tally);
            if count < threshold {
                return None;
            }
            let tier = trigger.tier();
            let tier_label = tier.label(settings).to_string();
            let message = event_message(
                student_name,
                &tier_label,
                trigger,
                threshold,
                settings.window_days,
                category,
            );
            Some(EscalationEvent {
                trigger,
                tier,
                tier_label,
                threshold,
                count,
                message,
            })
        })
        .collect();
    let notes = requirement_notes(settings);

    EscalationDecision {
        rule,
        tally,
        events,
        notes,
    }
}

// ============================================================================
// Service
// ============================================================================

/// Resolves the rule for an incident and checks every threshold.
pub struct EscalationEvaluator {
    resolver: Arc<RuleResolver>,
    counter: IncidentWindowCounter,
    directory: Arc<dyn TenantDirectory>,
}

impl EscalationEvaluator {
    /// Create a new evaluator.
    pub fn new(
        resolver: Arc<RuleResolver>,
        counter: IncidentWindowCounter,
        directory: Arc<dyn TenantDirectory>,
    ) -> Self {
        Self {
            resolver,
            counter,
            directory,
        }
    }

    /// Evaluate with the window anchored at the current time.
    pub async fn evaluate(&self, incident: &Incident) -> Result<EscalationDecision> {
        self.evaluate_at(incident, Utc::now()).await
    }

    /// Evaluate with the window anchored at `now`.
    pub async fn evaluate_at(
        &self,
        incident: &Incident,
        now: DateTime<Utc>,
    ) -> Result<EscalationDecision> {
        let rule = self
            .resolver
            .resolve(incident.organization_id, Some(incident.sub_unit_id))
            .await?;

        let student = self
            .directory
            .find_student(incident.student_id)
            .await?
            .ok_or_else(|| EscalationError::not_found("Student", incident.student_id))?;

        let tally = self
            .counter
            .tally(
                incident.student_id,
                &incident.category,
                rule.settings.window_days,
                now,
            )
            .await?;

        debug!(
            incident_id = %incident.id,
            student_id = %incident.student_id,
            rule_source = %rule.source(),
            window_days = rule.settings.window_days,
            same_category = tally.same_category,
            mixed = tally.mixed,
            major = tally.major,
            "Evaluated incident window"
        );

        Ok(decide(
            rule,
            tally,
            &student.display_name(),
            &incident.category,
        ))
    }
}
