use serde::Deserialize;

/// Response of `/api/v0/version`.
#[derive(Debug, Deserialize, Clone)]
pub struct VersionResponse {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(default, rename = "Repo")]
    pub repo: Option<String>,
    #[serde(default, rename = "System")]
    pub system: Option<String>,
}

/// Response of `/api/v0/repo/stat`.
#[derive(Debug, Deserialize, Clone)]
pub struct RepoStat {
    #[serde(rename = "RepoSize")]
    pub repo_size: i64,
    #[serde(default, rename = "StorageMax")]
    pub storage_max: Option<i64>,
    #[serde(default, rename = "NumObjects")]
    pub num_objects: Option<i64>,
    #[serde(default, rename = "RepoPath")]
    pub repo_path: Option<String>,
    #[serde(default, rename = "Version")]
    pub version: Option<String>,
}

/// Response of `/api/v0/id`.
#[derive(Debug, Deserialize, Clone)]
pub struct IdResponse {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default, rename = "PublicKey")]
    pub public_key: Option<String>,
    #[serde(default, rename = "Addresses")]
    pub addresses: Option<Vec<String>>,
    #[serde(default, rename = "AgentVersion")]
    pub agent_version: Option<String>,
}

/// Response of `/api/v0/swarm/peers`. Kubo sends `"Peers": null` when
/// there are no connections.
#[derive(Debug, Deserialize, Default)]
pub struct PeersResponse {
    #[serde(default, rename = "Peers")]
    pub peers: Option<Vec<SwarmPeer>>,
}

impl PeersResponse {
    pub fn count(&self) -> u32 {
        self.peers
            .as_ref()
            .map(|peers| u32::try_from(peers.len()).unwrap_or(u32::MAX))
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SwarmPeer {
    #[serde(default, rename = "Addr")]
    pub addr: Option<String>,
    #[serde(default, rename = "Peer")]
    pub peer: Option<String>,
}

/// Response of `/api/v0/stats/bw`. Totals are cumulative byte counters.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct BandwidthResponse {
    #[serde(rename = "TotalIn")]
    pub total_in: u64,
    #[serde(rename = "TotalOut")]
    pub total_out: u64,
    #[serde(default, rename = "RateIn")]
    pub rate_in: f64,
    #[serde(default, rename = "RateOut")]
    pub rate_out: f64,
}

/// One IPNS keypair known to the node.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Id")]
    pub id: String,
}

/// Response of `/api/v0/key/list` and `/api/v0/key/rm`.
#[derive(Debug, Deserialize, Default)]
pub struct KeyListResponse {
    #[serde(default, rename = "Keys")]
    pub keys: Vec<KeyEntry>,
}
