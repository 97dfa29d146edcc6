//! Shared daemon-control data structures.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::types::MonitorError;

/// Line the Kubo daemon prints on stdout once its API is serving.
pub const READY_MARKER: &str = "Daemon is ready";

/// How to start the node process.
#[derive(Debug, Clone)]
pub struct DaemonCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub ready_marker: String,
}

impl DaemonCommand {
    /// `ipfs daemon` against the given repository.
    pub fn kubo(binary: &str, repo_path: &Path) -> Self {
        Self {
            program: binary.to_string(),
            args: vec![
                "daemon".to_string(),
                "--migrate".to_string(),
                "--enable-namesys-pubsub".to_string(),
                "--enable-pubsub-experiment".to_string(),
            ],
            env: vec![(
                "IPFS_PATH".to_string(),
                repo_path.to_string_lossy().into_owned(),
            )],
            ready_marker: READY_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Spawned { pid: Option<u32> },
    AlreadyRunning,
}

/// Process control as seen by the poller and the command handlers.
#[async_trait]
pub trait DaemonControl: Send + Sync {
    async fn launch(&self) -> Result<LaunchOutcome, MonitorError>;
    async fn shutdown(&self) -> Result<(), MonitorError>;
    fn is_running(&self) -> bool;

    /// Readiness signal of the current process, if the implementation can
    /// tell when the node finished starting.
    fn ready(&self) -> Option<watch::Receiver<bool>> {
        None
    }
}
