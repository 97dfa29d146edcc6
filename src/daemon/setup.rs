//! Prepares the IPFS repository before the daemon is launched.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tokio::fs;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::ipfs_client::Ports;
use crate::types::MonitorError;

use super::system::run_ipfs;

pub const SWARM_PORT_RANGE: RangeInclusive<u16> = 4001..=4011;
pub const API_PORT_RANGE: RangeInclusive<u16> = 5981..=5991;
pub const GATEWAY_PORT_RANGE: RangeInclusive<u16> = 18181..=18191;

/// Whether nothing is listening on `port` (all interfaces).
pub async fn is_port_free(port: u16) -> bool {
    TcpListener::bind(("0.0.0.0", port)).await.is_ok()
}

/// First free port in `range`.
pub async fn scout_port(range: RangeInclusive<u16>) -> Option<u16> {
    for port in range {
        if is_port_free(port).await {
            return Some(port);
        }
    }
    None
}

/// Content providers the node peers with permanently.
fn peering_peers() -> Value {
    json!([
        {
            "ID": "12D3KooWBJY6ZVV8Tk8UDDFMEqWoxn89Xc8wnpm8uBFSR3ijDkui",
            "Addrs": [
                "/ip4/167.71.172.216/tcp/4001",
                "/ip6/2604:a880:800:10::826:1/tcp/4001",
                "/ip4/167.71.172.216/udp/4001/quic",
                "/ip6/2604:a880:800:10::826:1/udp/4001/quic"
            ]
        },
        {
            "ID": "12D3KooWDaGQ3Fu3iLgFxrrg5Vfef9z5L3DQZoyqFxQJbKKPnCc8",
            "Addrs": [
                "/ip4/143.198.18.166/tcp/4001",
                "/ip6/2604:a880:800:10::735:7001/tcp/4001",
                "/ip4/143.198.18.166/udp/4001/quic",
                "/ip6/2604:a880:800:10::735:7001/udp/4001/quic"
            ]
        },
        {
            "ID": "12D3KooWJ6MTkNM8Bu8DzNiRm1GY3Wqh8U8Pp1zRWap6xY3MvsNw",
            "Addrs": ["/dnsaddr/node-1.ipfs.bit.site"]
        },
        {
            "ID": "12D3KooWQ85aSCFwFkByr5e3pUCQeuheVhobVxGSSs1DrRQHGv1t",
            "Addrs": ["/dnsaddr/node-1.ipfs.4everland.net"]
        },
        {
            "ID": "12D3KooWGtYkBAaqJMJEmywMxaCiNP7LCEFUAFiLEBASe232c2VH",
            "Addrs": ["/dns4/bitswap.filebase.io/tcp/443/wss"]
        }
    ])
}

/// DNS-over-HTTPS resolvers for ENS-style TLDs.
fn dns_resolvers() -> Value {
    json!({
        "bit.": "https://dweb-dns.v2ex.pro/dns-query",
        "sol.": "https://dweb-dns.v2ex.pro/dns-query",
        "eth.": "https://dns.eth.limo/dns-query"
    })
}

fn swarm_conn_mgr() -> Value {
    json!({
        "GracePeriod": "20s",
        "HighWater": 240,
        "LowWater": 120,
        "Type": "basic"
    })
}

/// Initialises and configures a repository through the `ipfs` CLI.
pub struct RepoSetup {
    binary: String,
    repo_path: PathBuf,
}

impl RepoSetup {
    pub fn new(binary: impl Into<String>, repo_path: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            repo_path: repo_path.into(),
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Init the repo when empty, pick free ports and write the node config.
    /// Returns the ports the daemon will listen on.
    pub async fn prepare(&self) -> Result<Ports, MonitorError> {
        info!(repo = %self.repo_path.display(), binary = %self.binary, "Setting up IPFS");
        fs::create_dir_all(&self.repo_path).await?;

        if self.repo_is_empty().await? {
            info!("Initializing IPFS config");
            self.run(&["init"]).await?;
            info!("IPFS initialized");
        }

        let swarm = scout_port(SWARM_PORT_RANGE)
            .await
            .ok_or_else(|| MonitorError::NotReady("no open swarm port for IPFS".to_string()))?;
        let swarm_addrs = json!([
            format!("/ip4/0.0.0.0/tcp/{swarm}"),
            format!("/ip6/::/tcp/{swarm}"),
            format!("/ip4/0.0.0.0/udp/{swarm}/quic"),
            format!("/ip6/::/udp/{swarm}/quic"),
        ]);
        self.set_json("Addresses.Swarm", &swarm_addrs).await?;
        info!(port = swarm, "Updated swarm port");

        let api = scout_port(API_PORT_RANGE)
            .await
            .ok_or_else(|| MonitorError::NotReady("no open API port for IPFS".to_string()))?;
        self.run(&["config", "Addresses.API", &format!("/ip4/127.0.0.1/tcp/{api}")])
            .await?;
        info!(port = api, "Updated API port");

        let gateway = scout_port(GATEWAY_PORT_RANGE)
            .await
            .ok_or_else(|| MonitorError::NotReady("no open gateway port for IPFS".to_string()))?;
        self.run(&[
            "config",
            "Addresses.Gateway",
            &format!("/ip4/127.0.0.1/tcp/{gateway}"),
        ])
        .await?;
        info!(port = gateway, "Updated gateway port");

        if let Err(err) = self.set_json("Peering.Peers", &peering_peers()).await {
            warn!(error = ?err, "Unable to set peers for IPFS");
        }
        if let Err(err) = self.set_json("DNS.Resolvers", &dns_resolvers()).await {
            warn!(error = ?err, "Unable to set DNS resolvers");
        }

        self.set_json("Swarm.ConnMgr", &swarm_conn_mgr()).await?;
        self.set_json(
            "API.HTTPHeaders.Access-Control-Allow-Origin",
            &json!(["https://webui.ipfs.io"]),
        )
        .await?;
        if let Err(err) = self
            .set_json(
                "API.HTTPHeaders.Access-Control-Allow-Methods",
                &json!(["PUT", "POST"]),
            )
            .await
        {
            warn!(error = ?err, "Unable to set Access-Control-Allow-Methods");
        }

        info!("IPFS setup completed");
        Ok(Ports { api, gateway, swarm })
    }

    async fn repo_is_empty(&self) -> Result<bool, MonitorError> {
        let mut entries = fs::read_dir(&self.repo_path).await?;
        Ok(entries.next_entry().await?.is_none())
    }

    async fn set_json(&self, key: &str, value: &Value) -> Result<(), MonitorError> {
        let encoded = serde_json::to_string(value)?;
        self.run(&["config", key, &encoded, "--json"]).await.map(|_| ())
    }

    async fn run(&self, args: &[&str]) -> Result<String, MonitorError> {
        run_ipfs(&self.binary, &self.repo_path, args).await
    }
}
