//! Error types for the escalation engine.

use std::fmt::Display;

use thiserror::Error;

/// Errors raised by the escalation engine and its collaborators.
///
/// Propagation policy:
/// - `Unauthenticated` and rule-resolution failures abort an evaluation pass
///   before any notification is written.
/// - Per-recipient dispatch failures are collected into a report and surface,
///   at most, as a logged `PartialDispatchFailure`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscalationError {
    /// No tenant context accompanied the call. Never defaulted.
    #[error("Tenant context required")]
    Unauthenticated,

    /// A referenced entity does not exist or is outside the caller's tenant.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of entity, e.g. "Organization", "Notification".
        resource: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// A stored rule carried an unusable value; the system default replaces it.
    #[error("Misconfigured escalation rule: {0}")]
    Misconfiguration(String),

    /// Some recipients could not be notified while others were.
    #[error("Notification dispatch failed for {failed} of {attempted} recipients")]
    PartialDispatchFailure {
        /// Recipients the dispatcher tried.
        attempted: usize,
        /// Recipients whose notification could not be written.
        failed: usize,
    },

    /// Caller-supplied input was rejected.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A storage backend failed.
    #[error("Store error: {0}")]
    Store(String),
}

impl EscalationError {
    /// Build a `NotFound` error.
    pub fn not_found(resource: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Build a `Store` error from any backend error.
    pub fn store(err: impl Display) -> Self {
        Self::Store(err.to_string())
    }

    /// Check if this error indicates a missing tenant context.
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }

    /// Check if this error indicates a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<validator::ValidationErrors> for EscalationError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type alias for escalation operations.
pub type Result<T> = std::result::Result<T, EscalationError>;
