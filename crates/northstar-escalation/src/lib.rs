//! Tenant-scoped escalation of student behavior incidents.
//!
//! When an incident is recorded the engine resolves the effective rule for
//! the student's school, counts the student's incidents inside the rule's
//! trailing window, and notifies the administrators in the rule's scope once
//! per (incident, rule, administrator).
//!
//! # Services
//!
//! - [`services::RuleResolver`] - school override, district default, system default
//! - [`services::IncidentWindowCounter`] - windowed incident counts
//! - [`services::EscalationEvaluator`] - threshold decisions for one incident
//! - [`services::NotificationDispatcher`] - idempotent fan-out to administrators
//!
//! [`EscalationEngine`] wraps them behind tenant-checked operations. Each
//! store is a trait with an in-memory implementation; the PostgreSQL
//! implementations live in `northstar-db`.
//!
//! # Example
//!
//! ```rust,ignore
//! let engine = EscalationEngine::new(stores, EngineConfig::from_env());
//! let recorded = engine.record_incident(Some(&tenant), new_incident).await?;
//! if let Some(outcome) = recorded.escalation {
//!     println!("escalated: {}", outcome.is_escalated());
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::{EngineStores, EscalationEngine, EscalationOutcome, RecordedIncident};
pub use error::{EscalationError, Result};
pub use services::{
    Admin, AdminDirectory, DispatchReport, EscalationDecision, EscalationEvaluator,
    EscalationEvent, EscalationRule, InMemoryDirectory, InMemoryIncidentStore,
    InMemoryNotificationStore, InMemoryRuleStore, Incident, IncidentStore, IncidentWindowCounter,
    NewIncident, Notification, NotificationDispatcher, NotificationKey, NotificationStore,
    RecipientOutcome, RuleLookup, RuleResolver, RuleStore, Student, SubUnit, TenantDirectory,
    WindowTally,
};
pub use types::{EscalationTier, EscalationTrigger, RuleSettings, RuleSettingsInput, RuleSource};
