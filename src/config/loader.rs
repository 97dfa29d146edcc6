use std::path::Path;
use std::time::Duration;

use tokio::fs;
use tracing::{info, warn};

use crate::types::MonitorError;

use super::{paths, Config};

impl Config {
    /// Load configuration from config.json in the app directory
    /// Falls back to defaults if the file doesn't exist or can't be parsed
    pub async fn load() -> Self {
        let loaded = match paths::get_config_path() {
            Ok(path) => Self::load_from(&path).await,
            Err(err) => Err(err),
        };
        match loaded {
            Ok(config) => {
                info!(
                    binary = %config.ipfs_binary,
                    api_port = config.api_port,
                    gateway_port = config.gateway_port,
                    "Loaded configuration"
                );
                config
            }
            Err(err) => {
                warn!(error = ?err, "Failed to load config.json, using defaults");
                Self::default()
            }
        }
    }

    /// Read a config file; a missing file yields the defaults.
    pub async fn load_from(config_path: &Path) -> Result<Self, MonitorError> {
        if !config_path.exists() {
            warn!(path = %config_path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(config_path)
            .await
            .map_err(|err| MonitorError::Config(format!("Failed to read config file: {err}")))?;

        let config: Config = serde_json::from_str(&contents)
            .map_err(|err| MonitorError::Config(format!("Failed to parse config.json: {err}")))?;

        Ok(config.normalized())
    }

    /// Clamp intervals and limits that must never be zero.
    fn normalized(mut self) -> Self {
        self.poll_interval_secs = self.poll_interval_secs.max(1);
        self.query_timeout_secs = self.query_timeout_secs.clamp(1, 30);
        self.shutdown_timeout_secs = self.shutdown_timeout_secs.max(1);
        self.launch_timeout_secs = self.launch_timeout_secs.max(1);
        self.repo_stat_every_ticks = self.repo_stat_every_ticks.max(1);
        self.bandwidth_retention = self.bandwidth_retention.max(1);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn launch_timeout(&self) -> Duration {
        Duration::from_secs(self.launch_timeout_secs)
    }
}
