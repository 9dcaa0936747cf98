//! Northstar Core Library
//!
//! Strongly typed identifiers shared by every Northstar crate.
//!
//! # Example
//!
//! ```
//! use northstar_core::{OrganizationId, SubUnitId};
//!
//! let district = OrganizationId::new();
//! let school = SubUnitId::new();
//! assert_ne!(district.as_uuid(), school.as_uuid());
//! ```

pub mod ids;

pub use ids::{
    AdminId, EscalationRuleId, IncidentId, NotificationId, OrganizationId, ParseIdError,
    StudentId, SubUnitId,
};
