use std::env;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::types::MonitorError;

use super::Config;

const CONFIG_PATH_ENV: &str = "IPFS_MONITOR_CONFIG";

impl Config {
    /// Get the root directory of the application
    pub fn app_root_dir() -> Result<PathBuf, MonitorError> {
        let config_path = get_config_path()?;
        match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
            Some(_) => std::env::current_dir().map_err(|err| {
                MonitorError::Config(format!("Failed to determine app root: {err}"))
            }),
            None => Err(MonitorError::Config(
                "Unable to determine app root directory".to_string(),
            )),
        }
    }

    /// Get the IPFS repository path (`IPFS_PATH`)
    pub fn ipfs_repo_path(&self) -> Result<PathBuf, MonitorError> {
        match &self.repo_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(Self::app_root_dir()?.join("ipfs")),
        }
    }

    /// Get the path of the persisted settings file
    pub fn settings_file_path(&self) -> Result<PathBuf, MonitorError> {
        match &self.settings_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(Self::app_root_dir()?.join("settings.json")),
        }
    }
}

/// Get the path to the config.json file
/// Honors `IPFS_MONITOR_CONFIG`, otherwise looks in the app directory
/// (parent of the directory holding the executable)
pub(super) fn get_config_path() -> Result<PathBuf, MonitorError> {
    if let Ok(custom) = env::var(CONFIG_PATH_ENV) {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            debug!(path = %trimmed, "Using config path from environment");
            return Ok(PathBuf::from(trimmed));
        }
    }

    // Executable is at: app_root/bin/ipfs-daemon-monitor
    // Config should be at: app_root/config.json
    if let Ok(exe_path) = std::env::current_exe() {
        debug!(path = %exe_path.display(), "Executable path detected");

        if let Some(bin_dir) = exe_path.parent() {
            if let Some(app_root) = bin_dir.parent() {
                let config_path = app_root.join("config.json");
                debug!(path = %config_path.display(), "Looking for config");
                return Ok(config_path);
            }
        }
    }

    // Fallback: look in current directory
    warn!("Using fallback: looking for config.json in current directory");
    Ok(PathBuf::from("config.json"))
}
