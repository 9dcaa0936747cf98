//! Escalation rule rows.
//!
//! A district default has a NULL `sub_unit_id`. The unique index over
//! `(organization_id, COALESCE(sub_unit_id, nil))` keeps one rule per scope,
//! so saving is a single upsert that preserves the stored id and
//! `created_at`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use northstar_core::{EscalationRuleId, OrganizationId, SubUnitId};
use northstar_escalation::types::parse_roles;
use northstar_escalation::{EscalationRule, Result, RuleSettings, RuleStore};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::debug;
use uuid::Uuid;

use super::{from_column, to_column};
use crate::error::DbError;
use crate::pool::DbPool;

const SELECT_RULE: &str = r"
    SELECT
        id, organization_id, sub_unit_id,
        window_days, review_every_days,
        same_category_threshold, mixed_category_threshold, tier2_same_category_threshold,
        tier1_label, tier1_duration_days, tier2_label, tier2_duration_days,
        tier1_major_to_tier2, tier2_no_response_count, tier2_major_to_tier3,
        require_parent_contact, require_admin_approval, notify_roles,
        decay_count, decay_days, created_at, updated_at
    FROM escalation_rules
";

/// An `escalation_rules` row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EscalationRuleRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub sub_unit_id: Option<Uuid>,
    pub window_days: i32,
    pub review_every_days: i32,
    pub same_category_threshold: i32,
    pub mixed_category_threshold: i32,
    pub tier2_same_category_threshold: i32,
    pub tier1_label: String,
    pub tier1_duration_days: i32,
    pub tier2_label: String,
    pub tier2_duration_days: i32,
    pub tier1_major_to_tier2: i32,
    pub tier2_no_response_count: i32,
    pub tier2_major_to_tier3: i32,
    pub require_parent_contact: bool,
    pub require_admin_approval: bool,
    /// Comma-separated role tags.
    pub notify_roles: String,
    pub decay_count: i32,
    pub decay_days: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EscalationRuleRow> for EscalationRule {
    fn from(row: EscalationRuleRow) -> Self {
        Self {
            id: Some(EscalationRuleId::from_uuid(row.id)),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            sub_unit_id: row.sub_unit_id.map(SubUnitId::from_uuid),
            settings: RuleSettings {
                window_days: from_column(row.window_days),
                review_every_days: from_column(row.review_every_days),
                same_category_threshold: from_column(row.same_category_threshold),
                mixed_category_threshold: from_column(row.mixed_category_threshold),
                tier2_same_category_threshold: from_column(row.tier2_same_category_threshold),
                tier1_label: row.tier1_label,
                tier1_duration_days: from_column(row.tier1_duration_days),
                tier2_label: row.tier2_label,
                tier2_duration_days: from_column(row.tier2_duration_days),
                tier1_major_to_tier2: from_column(row.tier1_major_to_tier2),
                tier2_no_response_count: from_column(row.tier2_no_response_count),
                tier2_major_to_tier3: from_column(row.tier2_major_to_tier3),
                require_parent_contact: row.require_parent_contact,
                require_admin_approval: row.require_admin_approval,
                notify_roles: parse_roles(&row.notify_roles),
                decay_count: from_column(row.decay_count),
                decay_days: from_column(row.decay_days),
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL-backed rule store.
#[derive(Debug, Clone)]
pub struct PgRuleStore {
    pool: DbPool,
}

impl PgRuleStore {
    /// Create a store over `pool`.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn upsert(&self, rule: &EscalationRule) -> std::result::Result<EscalationRuleRow, DbError> {
        let s = &rule.settings;
        let id = rule.id.unwrap_or_default();

        let row = sqlx::query_as::<_, EscalationRuleRow>(
            r"
            INSERT INTO escalation_rules (
                id, organization_id, sub_unit_id,
                window_days, review_every_days,
                same_category_threshold, mixed_category_threshold, tier2_same_category_threshold,
                tier1_label, tier1_duration_days, tier2_label, tier2_duration_days,
                tier1_major_to_tier2, tier2_no_response_count, tier2_major_to_tier3,
                require_parent_contact, require_admin_approval, notify_roles,
                decay_count, decay_days, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22
            )
            ON CONFLICT (
                organization_id,
                (COALESCE(sub_unit_id, '00000000-0000-0000-0000-000000000000'::uuid))
            )
            DO UPDATE SET
                window_days = EXCLUDED.window_days,
                review_every_days = EXCLUDED.review_every_days,
                same_category_threshold = EXCLUDED.same_category_threshold,
                mixed_category_threshold = EXCLUDED.mixed_category_threshold,
                tier2_same_category_threshold = EXCLUDED.tier2_same_category_threshold,
                tier1_label = EXCLUDED.tier1_label,
                tier1_duration_days = EXCLUDED.tier1_duration_days,
                tier2_label = EXCLUDED.tier2_label,
                tier2_duration_days = EXCLUDED.tier2_duration_days,
                tier1_major_to_tier2 = EXCLUDED.tier1_major_to_tier2,
                tier2_no_response_count = EXCLUDED.tier2_no_response_count,
                tier2_major_to_tier3 = EXCLUDED.tier2_major_to_tier3,
                require_parent_contact = EXCLUDED.require_parent_contact,
                require_admin_approval = EXCLUDED.require_admin_approval,
                notify_roles = EXCLUDED.notify_roles,
                decay_count = EXCLUDED.decay_count,
                decay_days = EXCLUDED.decay_days,
                updated_at = EXCLUDED.updated_at
            RETURNING
                id, organization_id, sub_unit_id,
                window_days, review_every_days,
                same_category_threshold, mixed_category_threshold, tier2_same_category_threshold,
                tier1_label, tier1_duration_days, tier2_label, tier2_duration_days,
                tier1_major_to_tier2, tier2_no_response_count, tier2_major_to_tier3,
                require_parent_contact, require_admin_approval, notify_roles,
                decay_count, decay_days, created_at, updated_at
            ",
        )
        .bind(id.into_inner())
        .bind(rule.organization_id.into_inner())
        .bind(rule.sub_unit_id.map(SubUnitId::into_inner))
        .bind(to_column("window_days", s.window_days)?)
        .bind(to_column("review_every_days", s.review_every_days)?)
        .bind(to_column("same_category_threshold", s.same_category_threshold)?)
        .bind(to_column("mixed_category_threshold", s.mixed_category_threshold)?)
        .bind(to_column(
            "tier2_same_category_threshold",
            s.tier2_same_category_threshold,
        )?)
        .bind(&s.tier1_label)
        .bind(to_column("tier1_duration_days", s.tier1_duration_days)?)
        .bind(&s.tier2_label)
        .bind(to_column("tier2_duration_days", s.tier2_duration_days)?)
        .bind(to_column("tier1_major_to_tier2", s.tier1_major_to_tier2)?)
        .bind(to_column("tier2_no_response_count", s.tier2_no_response_count)?)
        .bind(to_column("tier2_major_to_tier3", s.tier2_major_to_tier3)?)
        .bind(s.require_parent_contact)
        .bind(s.require_admin_approval)
        .bind(s.notify_roles_csv())
        .bind(to_column("decay_count", s.decay_count)?)
        .bind(to_column("decay_days", s.decay_days)?)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .fetch_one(self.pool.inner())
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl RuleStore for PgRuleStore {
    async fn find_by_sub_unit(
        &self,
        organization_id: OrganizationId,
        sub_unit_id: SubUnitId,
    ) -> Result<Option<EscalationRule>> {
        let sql = format!("{SELECT_RULE} WHERE organization_id = $1 AND sub_unit_id = $2");
        let row = sqlx::query_as::<_, EscalationRuleRow>(&sql)
            .bind(organization_id.into_inner())
            .bind(sub_unit_id.into_inner())
            .fetch_optional(self.pool.inner())
            .await
            .map_err(DbError::from)?;
        Ok(row.map(EscalationRule::from))
    }

    async fn find_org_default(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<EscalationRule>> {
        let sql = format!("{SELECT_RULE} WHERE organization_id = $1 AND sub_unit_id IS NULL");
        let row = sqlx::query_as::<_, EscalationRuleRow>(&sql)
            .bind(organization_id.into_inner())
            .fetch_optional(self.pool.inner())
            .await
            .map_err(DbError::from)?;
        Ok(row.map(EscalationRule::from))
    }

    async fn save(&self, rule: EscalationRule) -> Result<EscalationRule> {
        let row = self.upsert(&rule).await?;
        debug!(
            rule_id = %row.id,
            organization_id = %row.organization_id,
            "Escalation rule saved"
        );
        Ok(row.into())
    }
}
