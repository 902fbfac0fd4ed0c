//! Status classification.
//!
//! A deployment runs exactly one [`StatusPolicy`]: either the server derives
//! the status from the inventory level, or the client supplies it and the
//! server checks it against an allow-list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Below this level a unit is `critical` under the computed policy.
pub const CRITICAL_BELOW: i64 = 200;
/// Below this level (and at or above [`CRITICAL_BELOW`]) a unit is `low`.
pub const LOW_BELOW: i64 = 500;

const COMPUTED_STATUSES: &[Status] = &[Status::Critical, Status::Low, Status::Operational];
const SUPPLIED_STATUSES: &[Status] = &[Status::Normal, Status::Warning, Status::Critical];

const COMPUTED_FIELDS: &[&str] = &["entity", "location", "inventory_level", "timestamp"];
const SUPPLIED_FIELDS: &[&str] = &["entity", "location", "inventory_level", "timestamp", "status"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("Invalid status '{value}'. Allowed values: {allowed}.")]
    InvalidStatus { value: String, allowed: String },

    #[error("status must be a string.")]
    MissingStatus,

    #[error("unknown status policy '{0}' (expected 'computed' or 'supplied')")]
    UnknownPolicy(String),

    #[error("unknown status '{0}'")]
    UnknownStatus(String),
}

/// Severity tier attached to every persisted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Critical,
    Low,
    Operational,
    Normal,
    Warning,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Critical => "critical",
            Status::Low => "low",
            Status::Operational => "operational",
            Status::Normal => "normal",
            Status::Warning => "warning",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, lowercase match. Used when reading rows back from storage.
impl FromStr for Status {
    type Err = ClassifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Status::Critical),
            "low" => Ok(Status::Low),
            "operational" => Ok(Status::Operational),
            "normal" => Ok(Status::Normal),
            "warning" => Ok(Status::Warning),
            other => Err(ClassifyError::UnknownStatus(other.to_string())),
        }
    }
}

/// Map an inventory level to its severity tier.
pub fn status_for_level(inventory_level: i64) -> Status {
    if inventory_level < CRITICAL_BELOW {
        Status::Critical
    } else if inventory_level < LOW_BELOW {
        Status::Low
    } else {
        Status::Operational
    }
}

/// Lower-case `raw` and accept it only if it is one of the client-facing statuses.
pub fn normalize_supplied_status(raw: &str) -> Result<Status, ClassifyError> {
    let lowered = raw.to_lowercase();
    let allowed = StatusPolicy::Supplied.allowed_statuses();
    allowed
        .iter()
        .copied()
        .find(|s| s.as_str() == lowered)
        .ok_or_else(|| ClassifyError::InvalidStatus {
            value: raw.to_string(),
            allowed: allowed_list(allowed),
        })
}

fn allowed_list(statuses: &[Status]) -> String {
    statuses
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Which side decides an event's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Status derived server-side from `inventory_level`; any submitted status is ignored.
    #[default]
    Computed,
    /// Status supplied by the client and checked against `normal`, `warning`, `critical`.
    Supplied,
}

impl StatusPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusPolicy::Computed => "computed",
            StatusPolicy::Supplied => "supplied",
        }
    }

    /// Fields a submission must carry under this policy, in reporting order.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            StatusPolicy::Computed => COMPUTED_FIELDS,
            StatusPolicy::Supplied => SUPPLIED_FIELDS,
        }
    }

    /// The closed status set every record stored under this policy belongs to.
    pub fn allowed_statuses(self) -> &'static [Status] {
        match self {
            StatusPolicy::Computed => COMPUTED_STATUSES,
            StatusPolicy::Supplied => SUPPLIED_STATUSES,
        }
    }

    pub fn checks_timestamp(self) -> bool {
        matches!(self, StatusPolicy::Computed)
    }

    pub fn classify(self, inventory_level: i64, supplied: Option<&str>) -> Result<Status, ClassifyError> {
        match self {
            StatusPolicy::Computed => Ok(status_for_level(inventory_level)),
            StatusPolicy::Supplied => {
                normalize_supplied_status(supplied.ok_or(ClassifyError::MissingStatus)?)
            }
        }
    }
}

impl fmt::Display for StatusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusPolicy {
    type Err = ClassifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "computed" => Ok(StatusPolicy::Computed),
            "supplied" => Ok(StatusPolicy::Supplied),
            other => Err(ClassifyError::UnknownPolicy(other.to_string())),
        }
    }
}
