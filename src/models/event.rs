use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Status;

/// Format of the server-assigned `received_at` stamp.
pub const RECEIVED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// One inventory observation as persisted and as returned by the dashboard.
/// Never mutated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEvent {
    pub entity: String,
    pub location: String,
    pub inventory_level: i64,
    pub status: Status,
    /// Observation time, stored exactly as the caller sent it.
    pub timestamp: String,
    /// When the server accepted the record (UTC, `Z` suffix).
    pub received_at: String,
}

impl InventoryEvent {
    pub fn new(submission: SubmitEvent, status: Status, received_at: DateTime<Utc>) -> Self {
        Self {
            entity: submission.entity,
            location: submission.location,
            inventory_level: submission.inventory_level,
            status,
            timestamp: submission.timestamp,
            received_at: received_at.format(RECEIVED_AT_FORMAT).to_string(),
        }
    }
}

// ── Request payloads ─────────────────────────────────────────────────────────

/// A submission that passed field validation but has not been classified yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitEvent {
    pub entity: String,
    pub location: String,
    pub inventory_level: i64,
    pub timestamp: String,
    /// Raw client status; only read under the supplied-status policy.
    pub status: Option<String>,
}

// ── Query parameters ──────────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DashboardParams {
    /// Kept as text so a malformed value reaches the handler instead of the extractor.
    pub limit: Option<String>,
}

impl DashboardParams {
    /// Build from raw query pairs. Repeated keys are allowed; the first one wins.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let limit = pairs
            .into_iter()
            .find_map(|(key, value)| (key == "limit").then_some(value));
        Self { limit }
    }
}
