//! Incident storage and windowed counting.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use northstar_core::{IncidentId, OrganizationId, StudentId, SubUnitId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use validator::Validate;

use crate::error::Result;

// ============================================================================
// Domain Types
// ============================================================================

/// A recorded behavior incident. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub organization_id: OrganizationId,
    pub sub_unit_id: SubUnitId,
    pub student_id: StudentId,
    /// Free-text category, compared case-insensitively.
    pub category: String,
    pub severity: String,
    pub description: Option<String>,
    pub reported_by: String,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording an incident.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewIncident {
    pub student_id: StudentId,
    #[validate(length(min = 1, max = 100, message = "Category must be 1-100 characters"))]
    pub category: String,
    #[validate(length(min = 1, max = 50, message = "Severity must be 1-50 characters"))]
    pub severity: String,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Reporter must be 1-200 characters"))]
    pub reported_by: String,
    /// Defaults to the time of recording.
    pub occurred_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Store Trait
// ============================================================================

/// Trait for incident storage backends.
#[async_trait::async_trait]
pub trait IncidentStore: Send + Sync {
    /// All incidents for a student, most recent occurrence first.
    async fn find_by_student_ordered_by_occurrence_desc(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Incident>>;

    /// Persist a new incident.
    async fn create(&self, incident: Incident) -> Result<Incident>;

    /// Look up an incident by id.
    async fn find_by_id(&self, id: IncidentId) -> Result<Option<Incident>>;
}

// ============================================================================
// In-Memory Store (for testing)
// ============================================================================

/// In-memory incident store for testing.
#[derive(Debug, Default)]
pub struct InMemoryIncidentStore {
    incidents: Arc<RwLock<HashMap<IncidentId, Incident>>>,
}

impl InMemoryIncidentStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get incident count.
    pub async fn count(&self) -> usize {
        self.incidents.read().await.len()
    }
}

#[async_trait::async_trait]
impl IncidentStore for InMemoryIncidentStore {
    async fn find_by_student_ordered_by_occurrence_desc(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Incident>> {
        let incidents = self.incidents.read().await;
        let mut found: Vec<Incident> = incidents
            .values()
            .filter(|i| i.student_id == student_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(found)
    }

    async fn create(&self, incident: Incident) -> Result<Incident> {
        self.incidents
            .write()
            .await
            .insert(incident.id, incident.clone());
        Ok(incident)
    }

    async fn find_by_id(&self, id: IncidentId) -> Result<Option<Incident>> {
        Ok(self.incidents.read().await.get(&id).cloned())
    }
}

// ============================================================================
// Window Counting
// ============================================================================

/// Counts of a student's incidents inside one trailing window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowTally {
    /// Incidents in the triggering category.
    pub same_category: u32,
    /// Incidents of any category.
    pub mixed: u32,
    /// Incidents with major severity.
    pub major: u32,
}

/// Tally incidents occurring in `[as_of - window_days, as_of]`.
///
/// The slice is sorted newest first before the walk, which stops at the
/// first incident older than the window start.
pub fn tally_window(
    incidents: &mut [Incident],
    category: &str,
    major_severity: &str,
    window_days: u32,
    as_of: DateTime<Utc>,
) -> WindowTally {
    incidents.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    // A window reaching past the earliest representable instant covers everything.
    let cutoff = as_of
        .checked_sub_signed(Duration::days(i64::from(window_days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let category = category.to_lowercase();
    let major_severity = major_severity.to_lowercase();

    let mut tally = WindowTally::default();
    for incident in incidents.iter() {
        if incident.occurred_at > as_of {
            continue;
        }
        if incident.occurred_at < cutoff {
            break;
        }
        tally.mixed += 1;
        if incident.category.to_lowercase() == category {
            tally.same_category += 1;
        }
        if incident.severity.to_lowercase() == major_severity {
            tally.major += 1;
        }
    }
    tally
}

/// Counts a student's matching incidents inside a rule's window.
pub struct IncidentWindowCounter {
    incidents: Arc<dyn IncidentStore>,
    major_severity: String,
}

impl IncidentWindowCounter {
    /// Create a counter that treats `major_severity` as the major tag.
    pub fn new(incidents: Arc<dyn IncidentStore>, major_severity: impl Into<String>) -> Self {
        Self {
            incidents,
            major_severity: major_severity.into(),
        }
    }

    /// Number of `category` incidents in `[as_of - window_days, as_of]`.
    pub async fn count_matching(
        &self,
        student_id: StudentId,
        category: &str,
        window_days: u32,
        as_of: DateTime<Utc>,
    ) -> Result<u32> {
        Ok(self
            .tally(student_id, category, window_days, as_of)
            .await?
            .same_category)
    }

    /// Same-category, all-category and major counts in one pass.
    pub async fn tally(
        &self,
        student_id: StudentId,
        category: &str,
        window_days: u32,
        as_of: DateTime<Utc>,
    ) -> Result<WindowTally> {
        let mut incidents = self
            .incidents
            .find_by_student_ordered_by_occurrence_desc(student_id)
            .await?;
        Ok(tally_window(
            &mut incidents,
            category,
            &self.major_severity,
            window_days,
            as_of,
        ))
    }
}
