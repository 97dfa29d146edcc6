use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::types::MonitorError;

use super::types::{DaemonCommand, DaemonControl, LaunchOutcome};

/// Owns the IPFS node process. Nothing else spawns or kills it.
pub struct DaemonSupervisor {
    command: DaemonCommand,
    shutdown_timeout: Duration,
    child: Mutex<Option<Child>>,
    /// Serialises launch and shutdown.
    op_lock: tokio::sync::Mutex<()>,
    ready: Arc<watch::Sender<bool>>,
}

impl DaemonSupervisor {
    pub fn new(command: DaemonCommand, shutdown_timeout: Duration) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            command,
            shutdown_timeout,
            child: Mutex::new(None),
            op_lock: tokio::sync::Mutex::new(()),
            ready: Arc::new(ready),
        }
    }

    /// Flips to `true` once the daemon printed its ready line, back to
    /// `false` when it stops.
    pub fn ready(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    pub fn pid(&self) -> Option<u32> {
        self.lock_child().as_ref().and_then(|child| child.id())
    }

    /// Start the node unless it is already running.
    pub async fn launch(&self) -> Result<LaunchOutcome, MonitorError> {
        let _op = self.op_lock.lock().await;
        if self.is_running() {
            debug!("IPFS daemon already running, not spawning another");
            return Ok(LaunchOutcome::AlreadyRunning);
        }

        info!(program = %self.command.program, args = ?self.command.args, "Launching IPFS daemon");
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .envs(self.command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                warn!(error = %err, "Failed to spawn IPFS daemon");
                MonitorError::ProcessSpawn(err)
            })?;

        self.ready.send_replace(false);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(
                stdout,
                "stdout",
                Some(self.command.ready_marker.clone()),
                Arc::clone(&self.ready),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, "stderr", None, Arc::clone(&self.ready)));
        }

        let pid = child.id();
        info!(?pid, "IPFS daemon process started");
        *self.lock_child() = Some(child);
        Ok(LaunchOutcome::Spawned { pid })
    }

    /// Ask the node to stop, force-kill it after the shutdown timeout.
    /// Succeeds trivially when nothing is running.
    pub async fn shutdown(&self) -> Result<(), MonitorError> {
        let _op = self.op_lock.lock().await;
        let taken = self.lock_child().take();
        let Some(mut child) = taken else {
            debug!("IPFS daemon not running, nothing to shut down");
            return Ok(());
        };

        if let Ok(Some(status)) = child.try_wait() {
            debug!(%status, "IPFS daemon had already exited");
            self.ready.send_replace(false);
            return Ok(());
        }

        info!(pid = ?child.id(), "Shutting down IPFS daemon");
        let result = if request_termination(&child) {
            match tokio::time::timeout(self.shutdown_timeout, child.wait()).await {
                Ok(Ok(status)) => {
                    info!(%status, "IPFS daemon shut down");
                    Ok(())
                }
                Ok(Err(err)) => {
                    warn!(error = %err, "Failed waiting for IPFS daemon, killing");
                    kill(&mut child).await
                }
                Err(_) => {
                    warn!(
                        timeout_secs = self.shutdown_timeout.as_secs(),
                        "IPFS daemon did not exit in time, killing"
                    );
                    kill(&mut child).await
                }
            }
        } else {
            kill(&mut child).await
        };

        self.ready.send_replace(false);
        result
    }

    /// Liveness of the owned process, independent of any API status.
    pub fn is_running(&self) -> bool {
        let mut guard = self.lock_child();
        let Some(child) = guard.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                warn!(%status, "IPFS daemon exited");
                *guard = None;
                self.ready.send_replace(false);
                false
            }
            Err(err) => {
                warn!(error = %err, "Failed to query IPFS daemon status");
                false
            }
        }
    }

    fn lock_child(&self) -> MutexGuard<'_, Option<Child>> {
        self.child
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DaemonControl for DaemonSupervisor {
    async fn launch(&self) -> Result<LaunchOutcome, MonitorError> {
        DaemonSupervisor::launch(self).await
    }

    async fn shutdown(&self) -> Result<(), MonitorError> {
        DaemonSupervisor::shutdown(self).await
    }

    fn is_running(&self) -> bool {
        DaemonSupervisor::is_running(self)
    }

    fn ready(&self) -> Option<watch::Receiver<bool>> {
        Some(DaemonSupervisor::ready(self))
    }
}

async fn kill(child: &mut Child) -> Result<(), MonitorError> {
    child.kill().await.map_err(MonitorError::Io)?;
    info!("IPFS daemon killed");
    Ok(())
}

#[cfg(unix)]
fn request_termination(child: &Child) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) else {
        return false;
    };
    match kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, pid, "Failed to send SIGTERM to IPFS daemon");
            false
        }
    }
}

#[cfg(not(unix))]
fn request_termination(_child: &Child) -> bool {
    false
}

async fn forward_output<R>(
    stream: R,
    name: &'static str,
    ready_marker: Option<String>,
    ready: Arc<watch::Sender<bool>>,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                debug!(stream = name, "[ipfs] {}", line);
                if ready_marker
                    .as_deref()
                    .is_some_and(|marker| line.contains(marker))
                {
                    info!("IPFS daemon is ready");
                    ready.send_replace(true);
                }
            }
            Ok(None) => break,
            Err(err) => {
                debug!(stream = name, error = %err, "Stopped reading IPFS daemon output");
                break;
            }
        }
    }
}
