//! Engine configuration loaded from environment variables.

use std::env;

/// Severity tag counted by the major-incident triggers when unset.
pub const DEFAULT_MAJOR_SEVERITY: &str = "major";

/// Runtime settings for [`crate::EscalationEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Incident severity, compared case-insensitively, that counts toward
    /// the major fast-track triggers. Default: `major`.
    pub major_severity: String,
}

impl EngineConfig {
    /// Load engine configuration from environment variables.
    ///
    /// `NORTHSTAR_MAJOR_SEVERITY` overrides the major severity tag. Blank
    /// values are ignored.
    pub fn from_env() -> Self {
        Self {
            major_severity: env::var("NORTHSTAR_MAJOR_SEVERITY")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_MAJOR_SEVERITY.to_string()),
        }
    }

    /// Use a different major severity tag.
    #[must_use]
    pub fn with_major_severity(mut self, severity: impl Into<String>) -> Self {
        self.major_severity = severity.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            major_severity: DEFAULT_MAJOR_SEVERITY.to_string(),
        }
    }
}
