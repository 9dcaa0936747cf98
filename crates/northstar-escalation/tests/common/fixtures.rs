//! Test fixtures factory for integration tests.

use chrono::{DateTime, Duration, Utc};
use northstar_core::{AdminId, IncidentId, OrganizationId, StudentId, SubUnitId};
use northstar_escalation::{Admin, Incident, NewIncident, RuleSettingsInput, Student};

/// A student record.
pub fn student(district: OrganizationId, school: SubUnitId, first: &str, last: &str) -> Student {
    Student {
        id: StudentId::new(),
        organization_id: district,
        sub_unit_id: school,
        first_name: first.to_string(),
        last_name: last.to_string(),
    }
}

/// An administrator with the "Admin" role.
pub fn admin(district: OrganizationId, school: Option<SubUnitId>, name: &str) -> Admin {
    Admin {
        id: AdminId::new(),
        organization_id: district,
        sub_unit_id: school,
        name: name.to_string(),
        role: "Admin".to_string(),
    }
}

/// A persisted-looking incident for `student`.
pub fn incident(
    student: &Student,
    category: &str,
    severity: &str,
    occurred_at: DateTime<Utc>,
) -> Incident {
    Incident {
        id: IncidentId::new(),
        organization_id: student.organization_id,
        sub_unit_id: student.sub_unit_id,
        student_id: student.id,
        category: category.to_string(),
        severity: severity.to_string(),
        description: Some(format!("{category} during class")),
        reported_by: "Ms. Rivera".to_string(),
        occurred_at,
        created_at: occurred_at,
    }
}

/// Input for recording a minor incident now.
pub fn new_incident(student_id: StudentId, category: &str) -> NewIncident {
    NewIncident {
        student_id,
        category: category.to_string(),
        severity: "minor".to_string(),
        description: None,
        reported_by: "Mr. Chen".to_string(),
        occurred_at: None,
    }
}

/// `days` days before `now`.
pub fn days_ago(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days)
}

/// Rule input with a window and same-category threshold; other fields default.
pub fn same_category_rule(window_days: u32, threshold: u32) -> RuleSettingsInput {
    RuleSettingsInput {
        window_days: Some(window_days),
        same_category_threshold: Some(threshold),
        ..Default::default()
    }
}
