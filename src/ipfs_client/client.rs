use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::types::MonitorError;

use super::api::{
    ArgQuery, BandwidthResponse, IdResponse, KeyEntry, KeyGenQuery, KeyListResponse,
    PeersResponse, RepoStat, VersionResponse,
};

/// Client for the Kubo RPC API (`POST /api/v0/...`) of the local node.
#[derive(Clone)]
pub struct IpfsClient {
    http: Client,
    base_url: String,
}

impl IpfsClient {
    /// Client for the node listening on `127.0.0.1:<api_port>`.
    pub fn new(http: Client, api_port: u16) -> Self {
        Self::with_base_url(http, format!("http://127.0.0.1:{api_port}"))
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Shared HTTP client; `timeout` bounds every single request.
    pub fn build_http(timeout: Duration) -> Result<Client, MonitorError> {
        Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(MonitorError::Http)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn version(&self) -> Result<VersionResponse, MonitorError> {
        self.call_json("version").await
    }

    pub async fn id(&self) -> Result<IdResponse, MonitorError> {
        self.call_json("id").await
    }

    pub async fn swarm_peers(&self) -> Result<PeersResponse, MonitorError> {
        self.call_json("swarm/peers").await
    }

    pub async fn bandwidth(&self) -> Result<BandwidthResponse, MonitorError> {
        self.call_json("stats/bw").await
    }

    pub async fn repo_stat(&self) -> Result<RepoStat, MonitorError> {
        self.call_json("repo/stat").await
    }

    /// All keypairs, including the node's own `self` key.
    pub async fn list_keys(&self) -> Result<Vec<KeyEntry>, MonitorError> {
        let response: KeyListResponse = self.call_json("key/list").await?;
        Ok(response.keys)
    }

    /// Generate an ed25519 keypair and return its IPNS name.
    pub async fn generate_key(&self, name: &str) -> Result<KeyEntry, MonitorError> {
        info!(name = %name, "Generating IPFS keypair");
        let query = KeyGenQuery {
            arg: name,
            key_type: "ed25519",
        };
        let key: KeyEntry = self.call_json_with_query("key/gen", &query).await?;
        info!(name = %key.name, id = %key.id, "Generated IPFS keypair");
        Ok(key)
    }

    pub async fn remove_key(&self, name: &str) -> Result<(), MonitorError> {
        info!(name = %name, "Removing IPFS keypair");
        let query = ArgQuery { arg: name };
        let response: KeyListResponse = self.call_json_with_query("key/rm", &query).await?;
        if !response.keys.iter().any(|key| key.name == name) {
            return Err(MonitorError::Ipfs(format!(
                "key/rm did not report removal of `{name}`"
            )));
        }
        Ok(())
    }

    async fn call_json<T>(&self, path: &str) -> Result<T, MonitorError>
    where
        T: DeserializeOwned,
    {
        self.call_json_with_query(path, &()).await
    }

    async fn call_json_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, MonitorError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = format!(
            "{}/api/v0/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let response = self
            .http
            .post(url)
            .query(query)
            .send()
            .await
            .map_err(|err| MonitorError::from_request(path, err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(path = %path, %status, body = %body.trim(), "IPFS API returned an error");
            return Err(MonitorError::Ipfs(format!("{} returned {}", path, status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| MonitorError::from_request(path, err))?;
        serde_json::from_slice(&bytes).map_err(MonitorError::Json)
    }
}
