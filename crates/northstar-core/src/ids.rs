//! Typed ids for districts, schools, students, staff and escalation records.
//!
//! Each id is a `Copy` newtype over [`Uuid`] that serializes as the bare UUID
//! string. Passing a school id where a district id is expected is a type
//! error:
//!
//! ```compile_fail
//! use northstar_core::{OrganizationId, SubUnitId};
//!
//! fn district_only(_: OrganizationId) {}
//! district_only(SubUnitId::new());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A string that is not a UUID was given where an id was expected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} must be a UUID, got {input:?}")]
pub struct ParseIdError {
    /// Name of the id type being parsed, e.g. `"StudentId"`.
    pub kind: &'static str,
    /// The rejected input.
    pub input: String,
}

macro_rules! define_id {
    ($name:ident, $entity:literal) => {
        #[doc = concat!("Identifier of ", $entity, ".")]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// A fresh random (v4) id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// The raw UUID, for binding into queries.
            #[must_use]
            pub fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<Uuid>().map(Self).map_err(|_| ParseIdError {
                    kind: stringify!($name),
                    input: s.to_string(),
                })
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(OrganizationId, "a district, the top-level tenant");
define_id!(SubUnitId, "a school inside a district");
define_id!(StudentId, "a student");
define_id!(AdminId, "an administrator who receives escalation notifications");
define_id!(IncidentId, "a recorded behavior incident");
define_id!(EscalationRuleId, "a stored escalation rule");
define_id!(NotificationId, "an administrator notification");
