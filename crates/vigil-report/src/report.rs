//! Report data model — the structured result of one fetch cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One parsed snapshot of the status page. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// When the source says it generated the page, if it says so at all.
    /// Never filled in from the local clock.
    pub generated_at: Option<DateTime<Utc>>,
    /// Total subjects covered by the page.
    pub total: u32,
    /// Subjects that succeeded.
    pub success_count: u32,
    /// Failed subjects, in source order.
    pub failures: Vec<FailureRecord>,
}

impl Report {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// One failed subject from the status page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Subject identifier from the card title.
    pub subject_id: String,
    /// Duration string as the source printed it ("2s", "1m3s", ...).
    pub duration: String,
    /// Free-text error detail.
    pub detail: String,
}
