//! Service layer for escalation.
//!
//! Each submodule pairs a store trait with an in-memory implementation and
//! the service that uses it.

pub mod directory;
pub mod dispatcher;
pub mod evaluator;
pub mod incidents;
pub mod notification;
pub mod rules;

// Re-export commonly used types
pub use directory::{Admin, AdminDirectory, InMemoryDirectory, Student, SubUnit, TenantDirectory};
pub use dispatcher::{DispatchReport, NotificationDispatcher, RecipientOutcome};
pub use evaluator::{EscalationDecision, EscalationEvaluator, EscalationEvent};
pub use incidents::{
    tally_window, InMemoryIncidentStore, Incident, IncidentStore, IncidentWindowCounter,
    NewIncident, WindowTally,
};
pub use notification::{InMemoryNotificationStore, Notification, NotificationKey, NotificationStore};
pub use rules::{EscalationRule, InMemoryRuleStore, RuleLookup, RuleResolver, RuleStore};
