//! State shared by license-seat and consumable-stock assignments.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult};

/// An assignment is written once as `Assigned` and may move to `Returned`
/// exactly once; nothing else about it changes.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    #[default]
    Assigned,
    Returned,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::Returned => "returned",
        }
    }

    pub fn is_active(self) -> bool {
        self == AssignmentStatus::Assigned
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s {
            "assigned" => Ok(AssignmentStatus::Assigned),
            "returned" => Ok(AssignmentStatus::Returned),
            other => Err(DomainError::validation(format!("unknown assignment status {other:?}"))),
        }
    }
}

pub(crate) fn require_assignee(assignee: &str) -> DomainResult<()> {
    if assignee.trim().is_empty() {
        return Err(DomainError::validation("assignee cannot be empty"));
    }
    Ok(())
}
