use serde::{Deserialize, Serialize};

/// Configuration for the IPFS daemon monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_ipfs_binary")]
    pub ipfs_binary: String,

    /// IPFS repository (`IPFS_PATH`); defaults to `<app root>/ipfs`
    #[serde(default)]
    pub repo_path: Option<String>,

    /// Settings file; defaults to `<app root>/settings.json`
    #[serde(default)]
    pub settings_path: Option<String>,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_gateway_port")]
    pub gateway_port: u16,

    #[serde(default = "default_swarm_port")]
    pub swarm_port: u16,

    /// Run `ipfs init` / `ipfs config` and scout free ports before launching
    #[serde(default = "default_true")]
    pub manage_repository: bool,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    #[serde(default = "default_launch_timeout")]
    pub launch_timeout_secs: u64,

    #[serde(default = "default_repo_stat_every")]
    pub repo_stat_every_ticks: u32,

    #[serde(default = "default_bandwidth_retention")]
    pub bandwidth_retention: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ipfs_binary: default_ipfs_binary(),
            repo_path: None,
            settings_path: None,
            api_port: default_api_port(),
            gateway_port: default_gateway_port(),
            swarm_port: default_swarm_port(),
            manage_repository: true,
            poll_interval_secs: default_poll_interval(),
            query_timeout_secs: default_query_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            launch_timeout_secs: default_launch_timeout(),
            repo_stat_every_ticks: default_repo_stat_every(),
            bandwidth_retention: default_bandwidth_retention(),
        }
    }
}

fn default_ipfs_binary() -> String {
    "ipfs".to_string()
}

fn default_api_port() -> u16 {
    5981
}

fn default_gateway_port() -> u16 {
    18181
}

fn default_swarm_port() -> u16 {
    4001
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    5
}

fn default_query_timeout() -> u64 {
    3
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_launch_timeout() -> u64 {
    30
}

fn default_repo_stat_every() -> u32 {
    4
}

fn default_bandwidth_retention() -> usize {
    60
}
