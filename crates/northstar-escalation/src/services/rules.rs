//! Escalation rule storage and resolution.
//!
//! A district may configure one default rule and one override per school.
//! Resolution tries the school override, then the district default, then
//! falls back to the built-in system default.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use northstar_core::{EscalationRuleId, OrganizationId, SubUnitId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use validator::Validate;

use crate::error::{EscalationError, Result};
use crate::services::directory::TenantDirectory;
use crate::types::{RuleSettings, RuleSettingsInput, RuleSource};

// ============================================================================
// Domain Types
// ============================================================================

/// An escalation rule scoped to a district or one of its schools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRule {
    /// `None` only for the synthesized system default.
    pub id: Option<EscalationRuleId>,
    pub organization_id: OrganizationId,
    /// `None` for the district-wide rule.
    pub sub_unit_id: Option<SubUnitId>,
    pub settings: RuleSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EscalationRule {
    /// Built-in defaults for a district. Never persisted.
    #[must_use]
    pub fn system_default(organization_id: OrganizationId) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            organization_id,
            sub_unit_id: None,
            settings: RuleSettings::system_default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Where this rule came from.
    #[must_use]
    pub fn source(&self) -> RuleSource {
        match (self.id, self.sub_unit_id) {
            (None, _) => RuleSource::SystemDefault,
            (Some(_), Some(_)) => RuleSource::SubUnit,
            (Some(_), None) => RuleSource::Organization,
        }
    }
}

// ============================================================================
// Store Trait
// ============================================================================

/// Trait for escalation rule storage backends.
#[async_trait::async_trait]
pub trait RuleStore: Send + Sync {
    /// The override for exactly this (district, school) pair.
    async fn find_by_sub_unit(
        &self,
        organization_id: OrganizationId,
        sub_unit_id: SubUnitId,
    ) -> Result<Option<EscalationRule>>;

    /// The district-wide rule.
    async fn find_org_default(&self, organization_id: OrganizationId)
        -> Result<Option<EscalationRule>>;

    /// Insert or replace the rule stored under the same
    /// (district, school) key. The stored id and `created_at` win over the
    /// given ones when a row already exists.
    async fn save(&self, rule: EscalationRule) -> Result<EscalationRule>;
}

// ============================================================================
// In-Memory Store (for testing)
// ============================================================================

type RuleKey = (OrganizationId, Option<SubUnitId>);

/// In-memory rule store for testing.
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    rules: Arc<RwLock<HashMap<RuleKey, EscalationRule>>>,
}

impl InMemoryRuleStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get rule count.
    pub async fn count(&self) -> usize {
        self.rules.read().await.len()
    }

    /// Store a rule as-is, bypassing validation. Used to seed broken rows.
    pub async fn insert_raw(&self, rule: EscalationRule) {
        self.rules
            .write()
            .await
            .insert((rule.organization_id, rule.sub_unit_id), rule);
    }
}

#[async_trait::async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn find_by_sub_unit(
        &self,
        organization_id: OrganizationId,
        sub_unit_id: SubUnitId,
    ) -> Result<Option<EscalationRule>> {
        let rules = self.rules.read().await;
        Ok(rules.get(&(organization_id, Some(sub_unit_id))).cloned())
    }

    async fn find_org_default(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<EscalationRule>> {
        let rules = self.rules.read().await;
        Ok(rules.get(&(organization_id, None)).cloned())
    }

    async fn save(&self, mut rule: EscalationRule) -> Result<EscalationRule> {
        let mut rules = self.rules.write().await;
        let key = (rule.organization_id, rule.sub_unit_id);

        if let Some(existing) = rules.get(&key) {
            rule.id = existing.id;
            rule.created_at = existing.created_at;
        }
        if rule.id.is_none() {
            rule.id = Some(EscalationRuleId::new());
        }

        rules.insert(key, rule.clone());
        Ok(rule)
    }
}

// ============================================================================
// Lookup Strategies
// ============================================================================

/// One step of the rule fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleLookup {
    /// The rule configured for the caller's school.
    SubUnitOverride,
    /// The district-wide rule.
    OrganizationDefault,
}

impl RuleLookup {
    /// Fallback order. The system default follows the last entry.
    pub const CHAIN: [Self; 2] = [Self::SubUnitOverride, Self::OrganizationDefault];

    async fn find(
        self,
        store: &dyn RuleStore,
        organization_id: OrganizationId,
        sub_unit_id: Option<SubUnitId>,
    ) -> Result<Option<EscalationRule>> {
        match (self, sub_unit_id) {
            (Self::SubUnitOverride, Some(sub_unit_id)) => {
                store.find_by_sub_unit(organization_id, sub_unit_id).await
            }
            (Self::SubUnitOverride, None) => Ok(None),
            (Self::OrganizationDefault, _) => store.find_org_default(organization_id).await,
        }
    }
}

// ============================================================================
// Service
// ============================================================================

/// Resolves and configures escalation rules.
pub struct RuleResolver {
    rules: Arc<dyn RuleStore>,
    directory: Arc<dyn TenantDirectory>,
}

impl RuleResolver {
    /// Create a new resolver.
    pub fn new(rules: Arc<dyn RuleStore>, directory: Arc<dyn TenantDirectory>) -> Self {
        Self { rules, directory }
    }

    /// Effective rule for a district and optional school.
    ///
    /// Absence of a rule is never an error: the system default is synthesized
    /// when no rule is stored. Unusable stored values are replaced by
    /// defaults. An unknown district, or a school outside it, is `NotFound`.
    pub async fn resolve(
        &self,
        organization_id: OrganizationId,
        sub_unit_id: Option<SubUnitId>,
    ) -> Result<EscalationRule> {
        self.check_scope(organization_id, sub_unit_id).await?;

        for lookup in RuleLookup::CHAIN {
            if let Some(rule) = lookup
                .find(self.rules.as_ref(), organization_id, sub_unit_id)
                .await?
            {
                debug!(
                    organization_id = %organization_id,
                    sub_unit_id = ?sub_unit_id,
                    lookup = ?lookup,
                    rule_id = ?rule.id,
                    "Resolved escalation rule"
                );
                return Ok(Self::repair(rule));
            }
        }

        debug!(
            organization_id = %organization_id,
            sub_unit_id = ?sub_unit_id,
            "No escalation rule configured, using system default"
        );
        Ok(EscalationRule::system_default(organization_id))
    }

    /// Create or update the rule for exactly this (district, school) key.
    pub async fn upsert(
        &self,
        organization_id: OrganizationId,
        sub_unit_id: Option<SubUnitId>,
        input: RuleSettingsInput,
    ) -> Result<EscalationRule> {
        input.validate()?;
        self.check_scope(organization_id, sub_unit_id).await?;

        let existing = match sub_unit_id {
            Some(sub_unit_id) => self.rules.find_by_sub_unit(organization_id, sub_unit_id).await?,
            None => self.rules.find_org_default(organization_id).await?,
        };

        let now = Utc::now();
        let rule = match existing {
            Some(mut rule) => {
                rule.settings.apply(input);
                rule.updated_at = now;
                rule
            }
            None => EscalationRule {
                id: Some(EscalationRuleId::new()),
                organization_id,
                sub_unit_id,
                settings: RuleSettings::from_input(input),
                created_at: now,
                updated_at: now,
            },
        };

        let saved = self.rules.save(rule).await?;
        debug!(
            organization_id = %organization_id,
            sub_unit_id = ?sub_unit_id,
            rule_id = ?saved.id,
            "Saved escalation rule"
        );
        Ok(saved)
    }

    async fn check_scope(
        &self,
        organization_id: OrganizationId,
        sub_unit_id: Option<SubUnitId>,
    ) -> Result<()> {
        if !self.directory.organization_exists(organization_id).await? {
            return Err(EscalationError::not_found("Organization", organization_id));
        }
        if let Some(sub_unit_id) = sub_unit_id {
            match self.directory.find_sub_unit(sub_unit_id).await? {
                Some(sub_unit) if sub_unit.organization_id == organization_id => {}
                _ => return Err(EscalationError::not_found("SubUnit", sub_unit_id)),
            }
        }
        Ok(())
    }

    fn repair(mut rule: EscalationRule) -> EscalationRule {
        let (settings, problems) = rule.settings.sanitized();
        for problem in problems {
            let err = EscalationError::Misconfiguration(problem);
            warn!(rule_id = ?rule.id, error = %err, "Substituting system default");
        }
        rule.settings = settings;
        rule
    }
}
