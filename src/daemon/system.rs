//! Runs one-shot `ipfs` CLI commands against the repository.

use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use crate::types::MonitorError;

/// Run `ipfs <args>` with `IPFS_PATH` pointing at `repo_path` and return
/// its trimmed stdout.
pub async fn run_ipfs(binary: &str, repo_path: &Path, args: &[&str]) -> Result<String, MonitorError> {
    debug!(binary = %binary, ?args, "Running ipfs command");
    let output = Command::new(binary)
        .args(args)
        .env("IPFS_PATH", repo_path)
        .output()
        .await?;
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    Err(MonitorError::Command(if stderr.is_empty() {
        format!(
            "Command `{}` with args {:?} failed with status {}",
            binary, args, output.status
        )
    } else {
        format!("Command `{}` with args {:?} failed: {}", binary, args, stderr)
    }))
}
