use tracing::warn;

use crate::types::MonitorError;

use super::super::api::NodeReport;
use super::super::client::IpfsClient;

/// Aggregates data from several node API endpoints into one report.
pub struct NodeProbe<'a> {
    client: &'a IpfsClient,
}

impl<'a> NodeProbe<'a> {
    pub fn new(client: &'a IpfsClient) -> Self {
        Self { client }
    }

    /// Query version (required), identity, peers and bandwidth, and the
    /// repo size when `include_repo_size` is set.
    ///
    /// A failing `version` call means the node is not answering and is
    /// returned as an error. The other endpoints degrade to empty values.
    pub async fn collect(&self, include_repo_size: bool) -> Result<NodeReport, MonitorError> {
        let version = self.client.version().await?;

        let peer_id = match self.client.id().await {
            Ok(id) => Some(id.id),
            Err(err) => {
                warn!(error = ?err, "Failed to fetch node identity");
                None
            }
        };

        let peer_count = match self.client.swarm_peers().await {
            Ok(peers) => peers.count(),
            Err(err) => {
                warn!(error = ?err, "Failed to fetch swarm peers");
                0
            }
        };

        let bandwidth = match self.client.bandwidth().await {
            Ok(bw) => Some(bw),
            Err(err) => {
                warn!(error = ?err, "Failed to fetch bandwidth stats");
                None
            }
        };

        let repo_size = if include_repo_size {
            match self.client.repo_stat().await {
                Ok(stat) => Some(stat.repo_size),
                Err(err) => {
                    warn!(error = ?err, "Failed to fetch repo stats");
                    None
                }
            }
        } else {
            None
        };

        Ok(NodeReport {
            version: version.version,
            peer_id,
            peer_count,
            bandwidth,
            repo_size,
        })
    }
}
