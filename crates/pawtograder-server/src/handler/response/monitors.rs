//! Monitor response types.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Liveness report.
#[must_use]
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    /// Timestamp when this status was generated.
    pub checked_at: Timestamp,
    /// Number of GitHub App installations loaded at startup.
    pub installations: usize,
    /// Application version.
    pub version: String,
}

impl MonitorStatus {
    /// Creates a report for the current instant.
    pub fn new(installations: usize) -> Self {
        Self {
            checked_at: Timestamp::now(),
            installations,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
