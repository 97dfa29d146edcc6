mod queries;
mod responses;
mod types;

pub use queries::{ArgQuery, KeyGenQuery};
pub use responses::NodeReport;
pub use types::{
    BandwidthResponse, IdResponse, KeyEntry, KeyListResponse, PeersResponse, RepoStat, SwarmPeer,
    VersionResponse,
};
