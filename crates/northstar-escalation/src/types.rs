//! Type definitions for the escalation domain.
//!
//! Includes the tier/trigger enums and the rule settings value shared by
//! persisted rules and the system default.

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

// ============================================================================
// System defaults
// ============================================================================

/// Trailing window, in days, used when nothing is configured.
pub const DEFAULT_WINDOW_DAYS: u32 = 14;
/// Longest trailing window a rule may use.
pub const MAX_WINDOW_DAYS: u32 = 365;
/// Review cadence, in days.
pub const DEFAULT_REVIEW_EVERY_DAYS: u32 = 10;
/// Same-category incidents needed for a tier-1 escalation.
pub const DEFAULT_SAME_CATEGORY_THRESHOLD: u32 = 4;
/// Incidents of any category needed for a tier-1 escalation.
pub const DEFAULT_MIXED_CATEGORY_THRESHOLD: u32 = 6;
/// Same-category incidents needed for a tier-2 escalation.
pub const DEFAULT_TIER2_SAME_CATEGORY_THRESHOLD: u32 = 8;
/// Tier-1 consequence label.
pub const DEFAULT_TIER1_LABEL: &str = "Saturday detention";
/// Tier-1 consequence length in days.
pub const DEFAULT_TIER1_DURATION_DAYS: u32 = 1;
/// Tier-2 consequence label.
pub const DEFAULT_TIER2_LABEL: &str = "Escalate to Tier 2";
/// Tier-2 consequence length in days.
pub const DEFAULT_TIER2_DURATION_DAYS: u32 = 10;
/// Major incidents that fast-track a student to tier 2.
pub const DEFAULT_TIER1_MAJOR_TO_TIER2: u32 = 1;
/// Unanswered tier-2 interventions before further review.
pub const DEFAULT_TIER2_NO_RESPONSE_COUNT: u32 = 3;
/// Major incidents that escalate a student to tier 3.
pub const DEFAULT_TIER2_MAJOR_TO_TIER3: u32 = 2;
/// Role tags notified by default.
pub const DEFAULT_NOTIFY_ROLES: &str = "Admin,Counselor";
/// Incidents forgiven per decay period.
pub const DEFAULT_DECAY_COUNT: u32 = 1;
/// Length of a decay period in days.
pub const DEFAULT_DECAY_DAYS: u32 = 7;
/// Tier-3 has no configurable label.
pub const TIER3_LABEL: &str = "Escalate to Tier 3";

// ============================================================================
// Enums
// ============================================================================

/// Escalation tier reached by a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTier {
    /// First consequence level (detention).
    Tier1,
    /// Targeted intervention.
    Tier2,
    /// Intensive intervention.
    Tier3,
}

impl EscalationTier {
    /// Human-readable label for this tier under the given settings.
    #[must_use]
    pub fn label<'a>(&self, settings: &'a RuleSettings) -> &'a str {
        match self {
            Self::Tier1 => &settings.tier1_label,
            Self::Tier2 => &settings.tier2_label,
            Self::Tier3 => TIER3_LABEL,
        }
    }
}

impl fmt::Display for EscalationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tier1 => write!(f, "tier_1"),
            Self::Tier2 => write!(f, "tier_2"),
            Self::Tier3 => write!(f, "tier_3"),
        }
    }
}

/// Which counter crossed which threshold.
///
/// Every trigger is an independent gate over the same window; several may
/// fire for one incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTrigger {
    /// Same-category count reached `same_category_threshold`.
    SameCategory,
    /// All-category count reached `mixed_category_threshold`.
    MixedCategory,
    /// Same-category count reached `tier2_same_category_threshold`.
    Tier2SameCategory,
    /// Major-severity count reached `tier1_major_to_tier2`.
    MajorToTier2,
    /// Major-severity count reached `tier2_major_to_tier3`.
    MajorToTier3,
}

impl EscalationTrigger {
    /// Evaluation order; also the order messages are combined in.
    pub const ALL: [Self; 5] = [
        Self::SameCategory,
        Self::MixedCategory,
        Self::Tier2SameCategory,
        Self::MajorToTier2,
        Self::MajorToTier3,
    ];

    /// Tier this trigger escalates to.
    #[must_use]
    pub fn tier(&self) -> EscalationTier {
        match self {
            Self::SameCategory | Self::MixedCategory => EscalationTier::Tier1,
            Self::Tier2SameCategory | Self::MajorToTier2 => EscalationTier::Tier2,
            Self::MajorToTier3 => EscalationTier::Tier3,
        }
    }

    /// Threshold this trigger compares against.
    #[must_use]
    pub fn threshold(&self, settings: &RuleSettings) -> u32 {
        match self {
            Self::SameCategory => settings.same_category_threshold,
            Self::MixedCategory => settings.mixed_category_threshold,
            Self::Tier2SameCategory => settings.tier2_same_category_threshold,
            Self::MajorToTier2 => settings.tier1_major_to_tier2,
            Self::MajorToTier3 => settings.tier2_major_to_tier3,
        }
    }
}

impl fmt::Display for EscalationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SameCategory => write!(f, "same_category"),
            Self::MixedCategory => write!(f, "mixed_category"),
            Self::Tier2SameCategory => write!(f, "tier2_same_category"),
            Self::MajorToTier2 => write!(f, "major_to_tier2"),
            Self::MajorToTier3 => write!(f, "major_to_tier3"),
        }
    }
}

/// Where an effective rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    /// A school-specific override.
    SubUnit,
    /// The district-wide default row.
    Organization,
    /// Hard-coded defaults; never persisted.
    SystemDefault,
}

impl fmt::Display for RuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubUnit => write!(f, "sub_unit"),
            Self::Organization => write!(f, "organization"),
            Self::SystemDefault => write!(f, "system_default"),
        }
    }
}

// ============================================================================
// Rule settings
// ============================================================================

/// Thresholds, windows and labels of one escalation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSettings {
    /// Trailing window, in days, over which incidents are counted.
    pub window_days: u32,
    /// How often escalated students are reviewed, in days.
    pub review_every_days: u32,
    /// Same-category incidents for tier 1.
    pub same_category_threshold: u32,
    /// Incidents of any category for tier 1.
    pub mixed_category_threshold: u32,
    /// Same-category incidents for tier 2.
    pub tier2_same_category_threshold: u32,
    /// Tier-1 consequence label.
    pub tier1_label: String,
    /// Tier-1 consequence length in days.
    pub tier1_duration_days: u32,
    /// Tier-2 consequence label.
    pub tier2_label: String,
    /// Tier-2 consequence length in days.
    pub tier2_duration_days: u32,
    /// Major incidents that fast-track to tier 2.
    pub tier1_major_to_tier2: u32,
    /// Unanswered tier-2 interventions before further review.
    pub tier2_no_response_count: u32,
    /// Major incidents that escalate to tier 3.
    pub tier2_major_to_tier3: u32,
    /// Whether escalations require contacting a parent.
    pub require_parent_contact: bool,
    /// Whether escalations require administrator approval.
    pub require_admin_approval: bool,
    /// Role tags to notify.
    pub notify_roles: Vec<String>,
    /// Incidents forgiven per decay period.
    pub decay_count: u32,
    /// Decay period in days.
    pub decay_days: u32,
}

impl RuleSettings {
    /// The hard-coded defaults used when no rule is configured.
    #[must_use]
    pub fn system_default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            review_every_days: DEFAULT_REVIEW_EVERY_DAYS,
            same_category_threshold: DEFAULT_SAME_CATEGORY_THRESHOLD,
            mixed_category_threshold: DEFAULT_MIXED_CATEGORY_THRESHOLD,
            tier2_same_category_threshold: DEFAULT_TIER2_SAME_CATEGORY_THRESHOLD,
            tier1_label: DEFAULT_TIER1_LABEL.to_string(),
            tier1_duration_days: DEFAULT_TIER1_DURATION_DAYS,
            tier2_label: DEFAULT_TIER2_LABEL.to_string(),
            tier2_duration_days: DEFAULT_TIER2_DURATION_DAYS,
            tier1_major_to_tier2: DEFAULT_TIER1_MAJOR_TO_TIER2,
            tier2_no_response_count: DEFAULT_TIER2_NO_RESPONSE_COUNT,
            tier2_major_to_tier3: DEFAULT_TIER2_MAJOR_TO_TIER3,
            require_parent_contact: true,
            require_admin_approval: false,
            notify_roles: parse_roles(DEFAULT_NOTIFY_ROLES),
            decay_count: DEFAULT_DECAY_COUNT,
            decay_days: DEFAULT_DECAY_DAYS,
        }
    }

    /// Settings for a new rule: given fields, system defaults elsewhere.
    #[must_use]
    pub fn from_input(input: RuleSettingsInput) -> Self {
        let mut settings = Self::system_default();
        settings.apply(input);
        settings
    }

    /// Overwrite the fields present in `input`, keeping the rest.
    pub fn apply(&mut self, input: RuleSettingsInput) {
        let RuleSettingsInput {
            window_days,
            review_every_days,
            same_category_threshold,
            mixed_category_threshold,
            tier2_same_category_threshold,
            tier1_label,
            tier1_duration_days,
            tier2_label,
            tier2_duration_days,
            tier1_major_to_tier2,
            tier2_no_response_count,
            tier2_major_to_tier3,
            require_parent_contact,
            require_admin_approval,
            notify_roles,
            decay_count,
            decay_days,
        } = input;

        macro_rules! set_if_some {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = $field { self.$field = value; })*
            };
        }

        set_if_some!(
            window_days,
            review_every_days,
            same_category_threshold,
            mixed_category_threshold,
            tier2_same_category_threshold,
            tier1_label,
            tier1_duration_days,
            tier2_label,
            tier2_duration_days,
            tier1_major_to_tier2,
            tier2_no_response_count,
            tier2_major_to_tier3,
            require_parent_contact,
            require_admin_approval,
            notify_roles,
            decay_count,
            decay_days,
        );
    }

    /// Replace unusable values with system defaults.
    ///
    /// Returns the repaired settings and one description per replaced field.
    /// A zero window or threshold would make every incident escalate, so
    /// those are treated as missing. A window longer than
    /// [`MAX_WINDOW_DAYS`] is treated the same way.
    #[must_use]
    pub fn sanitized(mut self) -> (Self, Vec<String>) {
        let defaults = Self::system_default();
        let mut problems = Vec::new();

        macro_rules! require_positive {
            ($($field:ident),* $(,)?) => {
                $(if self.$field == 0 {
                    problems.push(format!(
                        "{} is 0, using default {}",
                        stringify!($field),
                        defaults.$field
                    ));
                    self.$field = defaults.$field;
                })*
            };
        }

        macro_rules! require_label {
            ($($field:ident),* $(,)?) => {
                $(if self.$field.trim().is_empty() {
                    problems.push(format!(
                        "{} is empty, using default '{}'",
                        stringify!($field),
                        defaults.$field
                    ));
                    self.$field = defaults.$field.clone();
                })*
            };
        }

        require_positive!(
            window_days,
            same_category_threshold,
            mixed_category_threshold,
            tier2_same_category_threshold,
            tier1_major_to_tier2,
            tier2_major_to_tier3,
        );
        require_label!(tier1_label, tier2_label);

        if self.window_days > MAX_WINDOW_DAYS {
            problems.push(format!(
                "window_days is {}, above the {} day limit, using default {}",
                self.window_days, MAX_WINDOW_DAYS, defaults.window_days
            ));
            self.window_days = defaults.window_days;
        }

        (self, problems)
    }

    /// Notify roles as the comma-separated form used in storage.
    #[must_use]
    pub fn notify_roles_csv(&self) -> String {
        self.notify_roles.join(",")
    }
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self::system_default()
    }
}

/// Split a comma-separated role list, dropping blanks.
#[must_use]
pub fn parse_roles(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Partial rule values supplied when configuring a rule.
///
/// On create, absent fields take the system default. On update, absent
/// fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RuleSettingsInput {
    #[validate(range(min = 1, max = 365, message = "Window must be 1-365 days"))]
    pub window_days: Option<u32>,
    #[validate(range(min = 1, max = 365, message = "Review cadence must be 1-365 days"))]
    pub review_every_days: Option<u32>,
    #[validate(range(min = 1, message = "Same-category threshold must be at least 1"))]
    pub same_category_threshold: Option<u32>,
    #[validate(range(min = 1, message = "Mixed-category threshold must be at least 1"))]
    pub mixed_category_threshold: Option<u32>,
    #[validate(range(min = 1, message = "Tier-2 threshold must be at least 1"))]
    pub tier2_same_category_threshold: Option<u32>,
    #[validate(length(min = 1, max = 100, message = "Tier-1 label must be 1-100 characters"))]
    pub tier1_label: Option<String>,
    pub tier1_duration_days: Option<u32>,
    #[validate(length(min = 1, max = 100, message = "Tier-2 label must be 1-100 characters"))]
    pub tier2_label: Option<String>,
    pub tier2_duration_days: Option<u32>,
    #[validate(range(min = 1, message = "Major fast-track count must be at least 1"))]
    pub tier1_major_to_tier2: Option<u32>,
    pub tier2_no_response_count: Option<u32>,
    #[validate(range(min = 1, message = "Tier-3 major count must be at least 1"))]
    pub tier2_major_to_tier3: Option<u32>,
    pub require_parent_contact: Option<bool>,
    pub require_admin_approval: Option<bool>,
    pub notify_roles: Option<Vec<String>>,
    pub decay_count: Option<u32>,
    pub decay_days: Option<u32>,
}
