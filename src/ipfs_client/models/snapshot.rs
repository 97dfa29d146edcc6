use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ipfs_client::api::NodeReport;

/// Immutable record of the node's status at one poll tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub online: bool,
    pub peer_count: u32,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_size_bytes: Option<i64>,
    pub captured_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn offline(captured_at: DateTime<Utc>) -> Self {
        Self {
            online: false,
            peer_count: 0,
            version: String::new(),
            peer_id: None,
            repo_size_bytes: None,
            captured_at,
        }
    }

    pub fn from_report(report: &NodeReport, captured_at: DateTime<Utc>) -> Self {
        Self {
            online: true,
            peer_count: report.peer_count,
            version: report.version.clone(),
            peer_id: report.peer_id.clone(),
            repo_size_bytes: report.repo_size,
            captured_at,
        }
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::offline(DateTime::<Utc>::UNIX_EPOCH)
    }
}
