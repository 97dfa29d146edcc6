use super::types::BandwidthResponse;

/// Everything one poll tick learned from the node API.
#[derive(Debug, Clone)]
pub struct NodeReport {
    pub version: String,
    pub peer_id: Option<String>,
    pub peer_count: u32,
    pub bandwidth: Option<BandwidthResponse>,
    pub repo_size: Option<i64>,
}
