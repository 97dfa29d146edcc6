//! Command surface over the daemon, its status and the saved settings.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::daemon::{DaemonCommand, DaemonControl, DaemonSupervisor, LaunchOutcome, RepoSetup};
use crate::ipfs_client::api::KeyEntry;
use crate::ipfs_client::{IpfsClient, NodeProbe, Ports, StatusSnapshot};
use crate::persistence::{Point, ScreenFrame, SettingsStore, Size};
use crate::poller::Poller;
use crate::state::{
    control_channel, spawn_control_loop, ConsumerGuard, DaemonPhase, Liveness, StateUpdate,
    StateUpdateSender, StatusState, StatusView, TickReport, WindowKind,
};
use crate::types::MonitorError;

/// Name of the node's own identity key, never listed or removed.
const SELF_KEY: &str = "self";

/// How often a starting daemon is checked for an early exit.
const STARTUP_LIVENESS_INTERVAL: Duration = Duration::from_millis(100);

/// Owns the supervisor, the status state and its background tasks.
///
/// Must be created inside a tokio runtime.
pub struct Monitor {
    config: Config,
    state: StatusState,
    daemon: Arc<dyn DaemonControl>,
    settings: SettingsStore,
    setup: Option<RepoSetup>,
    updates: StateUpdateSender,
    http: Client,
    cancel: CancellationToken,
    poller_cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Monitor {
    /// Build the monitor for the configured `ipfs` binary and repository
    /// and start polling.
    pub async fn start(config: Config) -> Result<Self, MonitorError> {
        let repo_path = config.ipfs_repo_path()?;
        let settings = SettingsStore::open(config.settings_file_path()?).await;
        let supervisor = DaemonSupervisor::new(
            DaemonCommand::kubo(&config.ipfs_binary, &repo_path),
            config.shutdown_timeout(),
        );
        let setup = config
            .manage_repository
            .then(|| RepoSetup::new(config.ipfs_binary.clone(), repo_path));
        Self::with_parts(config, Arc::new(supervisor), settings, setup)
    }

    /// Build the monitor around an arbitrary process controller.
    pub fn with_parts(
        config: Config,
        daemon: Arc<dyn DaemonControl>,
        settings: SettingsStore,
        setup: Option<RepoSetup>,
    ) -> Result<Self, MonitorError> {
        let ports = Ports {
            api: config.api_port,
            gateway: config.gateway_port,
            swarm: config.swarm_port,
        };
        let state = StatusState::new(ports, config.bandwidth_retention);
        let http = IpfsClient::build_http(config.query_timeout())?;
        let (updates, rx) = control_channel();

        let cancel = CancellationToken::new();
        let poller_cancel = cancel.child_token();
        let control = spawn_control_loop(state.clone(), rx, cancel.clone());
        let poller = Poller::new(
            state.clone(),
            Arc::clone(&daemon),
            http.clone(),
            updates.clone(),
            &config,
        )
        .spawn(poller_cancel.clone());

        info!(
            api_port = ports.api,
            gateway_port = ports.gateway,
            settings = %settings.path().display(),
            "IPFS daemon monitor started"
        );

        Ok(Self {
            config,
            state,
            daemon,
            settings,
            setup,
            updates,
            http,
            cancel,
            poller_cancel,
            tasks: Mutex::new(vec![control, poller]),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &StatusState {
        &self.state
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn status(&self) -> StatusView {
        self.state.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusView> {
        self.state.subscribe()
    }

    pub fn register_consumer(&self) -> ConsumerGuard {
        self.state.register_consumer()
    }

    pub fn request_refresh(&self) {
        self.state.request_refresh();
    }

    /// Initialise and configure the repository, then publish the ports it
    /// was given. A no-op returning the configured ports when repository
    /// management is disabled.
    pub async fn prepare_repository(&self) -> Result<Ports, MonitorError> {
        let Some(setup) = &self.setup else {
            return Ok(self.state.ports());
        };
        match setup.prepare().await {
            Ok(ports) => {
                self.submit(StateUpdate::Ports(ports)).await;
                Ok(ports)
            }
            Err(err) => {
                warn!(error = ?err, repo = %setup.repo_path().display(), "IPFS setup failed");
                self.submit(StateUpdate::NotRunningReason(Some(format!(
                    "IPFS setup failed: {err}"
                ))))
                .await;
                Err(err)
            }
        }
    }

    /// Launch at startup unless the user last switched the daemon off.
    pub async fn auto_launch(&self) -> Result<Option<LaunchOutcome>, MonitorError> {
        if self.settings.load_daemon_preference().await == Some(false) {
            info!("IPFS daemon was switched off by the user, not launching");
            return Ok(None);
        }
        self.launch().await.map(Some)
    }

    /// User toggle. The preference is written only when the launch or
    /// shutdown succeeded; on error the caller reverts its control.
    ///
    /// A failure to save the preference is returned as well. The daemon has
    /// already changed state by then, and the status view shows which.
    pub async fn set_daemon_enabled(&self, enabled: bool) -> Result<(), MonitorError> {
        if enabled {
            self.launch().await?;
        } else {
            self.shutdown_daemon().await?;
        }
        self.settings
            .save_daemon_preference(enabled)
            .await
            .map_err(|err| {
                warn!(error = ?err, enabled, "Failed to save daemon preference");
                err
            })
    }

    /// Start the daemon and wait (bounded) for it to report readiness.
    ///
    /// Fails when the process cannot be spawned or exits before it is
    /// ready. Once ready the node is queried right away, so the phase leaves
    /// `Launching` even when no status consumer is registered.
    pub async fn launch(&self) -> Result<LaunchOutcome, MonitorError> {
        self.submit(StateUpdate::NotRunningReason(None)).await;
        if !self.state.current().online() {
            self.submit(StateUpdate::Phase(DaemonPhase::Launching)).await;
        }

        let started = match self.daemon.launch().await {
            Ok(outcome @ LaunchOutcome::Spawned { .. }) => {
                self.wait_until_ready().await.map(|()| outcome)
            }
            other => other,
        };
        let outcome = match started {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = ?err, "Failed to launch IPFS daemon");
                self.submit(StateUpdate::NotRunningReason(Some(err.to_string())))
                    .await;
                self.submit(StateUpdate::Offline { at: Utc::now() }).await;
                return Err(err);
            }
        };

        self.probe_now().await;
        self.state.request_refresh();
        Ok(outcome)
    }

    /// Stop the daemon. Polls in flight are discarded so a late answer
    /// cannot flip the status back online.
    pub async fn shutdown_daemon(&self) -> Result<(), MonitorError> {
        self.submit(StateUpdate::Phase(DaemonPhase::ShuttingDown))
            .await;
        self.state.invalidate_polls();

        let result = self.daemon.shutdown().await;
        if let Err(err) = &result {
            warn!(error = ?err, "Failed to shut down IPFS daemon");
        }

        self.state.invalidate_polls();
        self.submit(StateUpdate::Offline { at: Utc::now() }).await;
        self.state.request_refresh();
        result
    }

    /// Keys of the running node, without the node's own `self` key.
    pub async fn list_keys(&self) -> Result<Vec<KeyEntry>, MonitorError> {
        let keys = self.api_client().await?.list_keys().await?;
        Ok(keys.into_iter().filter(|key| key.name != SELF_KEY).collect())
    }

    pub async fn key_exists(&self, name: &str) -> Result<bool, MonitorError> {
        Ok(self.list_keys().await?.iter().any(|key| key.name == name))
    }

    pub async fn generate_key(&self, name: &str) -> Result<KeyEntry, MonitorError> {
        validate_key_name(name)?;
        self.api_client().await?.generate_key(name).await
    }

    pub async fn remove_key(&self, name: &str) -> Result<(), MonitorError> {
        validate_key_name(name)?;
        self.api_client().await?.remove_key(name).await
    }

    pub async fn set_window_visible(&self, window: WindowKind, visible: bool) {
        self.submit(StateUpdate::Window { window, visible }).await;
    }

    /// Hide `window` and remember where it was.
    pub async fn close_window(&self, window: WindowKind, origin: Point) -> Result<(), MonitorError> {
        self.set_window_visible(window, false).await;
        self.settings.save_origin(window, origin).await
    }

    pub async fn window_origin(&self, window: WindowKind, screen: ScreenFrame, size: Size) -> Point {
        self.settings.load_origin(window, screen, size).await
    }

    /// Stop polling, shut the daemon down and end the background tasks.
    /// The user's launch preference is left as it is.
    pub async fn stop(&self) {
        info!("Stopping IPFS daemon monitor");
        self.poller_cancel.cancel();
        if let Err(err) = self.shutdown_daemon().await {
            warn!(error = ?err, "IPFS daemon did not shut down cleanly");
        }
        self.cancel.cancel();

        let handles = std::mem::take(&mut *self.lock_tasks());
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = ?err, "Monitor task ended abnormally");
            }
        }
        info!("IPFS daemon monitor stopped");
    }

    /// Wait for the ready line, bounded by the launch timeout. A process
    /// that exits first is an error; a slow one is only logged and left to
    /// the poller.
    async fn wait_until_ready(&self) -> Result<(), MonitorError> {
        let Some(mut ready) = self.daemon.ready() else {
            return Ok(());
        };
        let timeout = self.config.launch_timeout();
        let deadline = tokio::time::Instant::now() + timeout;
        let mut liveness = tokio::time::interval(STARTUP_LIVENESS_INTERVAL);

        loop {
            if *ready.borrow_and_update() {
                debug!("IPFS daemon reported ready");
                return Ok(());
            }
            tokio::select! {
                biased;
                changed = ready.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
                _ = liveness.tick() => {
                    if !self.daemon.is_running() {
                        return Err(MonitorError::NotReady(
                            "IPFS daemon exited before it was ready".to_string(),
                        ));
                    }
                }
                () = tokio::time::sleep_until(deadline) => {
                    warn!(
                        timeout_secs = timeout.as_secs(),
                        "IPFS daemon did not report ready in time"
                    );
                    return Ok(());
                }
            }
        }
    }

    /// One status query outside the poll schedule. No bandwidth sample is
    /// taken so the poller's rate baseline stays intact.
    async fn probe_now(&self) {
        let epoch = self.state.epoch();
        let process_running = self.daemon.is_running();
        let now = Utc::now();
        let snapshot = if process_running {
            let client = IpfsClient::new(self.http.clone(), self.state.ports().api);
            let probe = NodeProbe::new(&client);
            match tokio::time::timeout(self.config.query_timeout(), probe.collect(false)).await {
                Ok(Ok(report)) => StatusSnapshot::from_report(&report, now),
                Ok(Err(err)) => {
                    debug!(error = ?err, "IPFS API not answering yet");
                    StatusSnapshot::offline(now)
                }
                Err(_) => {
                    debug!("IPFS status query timed out");
                    StatusSnapshot::offline(now)
                }
            }
        } else {
            StatusSnapshot::offline(now)
        };

        let tick = TickReport {
            epoch,
            liveness: Liveness {
                process_running,
                api_online: snapshot.online,
            },
            snapshot,
            sample: None,
        };
        self.submit(StateUpdate::Tick(tick)).await;
    }

    /// Client for key commands. Works while the node answers, whether or
    /// not the poller has seen it online yet.
    async fn api_client(&self) -> Result<IpfsClient, MonitorError> {
        let view = self.state.current();
        let client = IpfsClient::new(self.http.clone(), view.ports.api);
        if view.online() {
            return Ok(client);
        }
        if !self.daemon.is_running() {
            return Err(MonitorError::NotReady(
                "IPFS daemon is not running".to_string(),
            ));
        }
        match client.version().await {
            Ok(_) => Ok(client),
            Err(err) => {
                debug!(error = ?err, "IPFS API not answering");
                Err(MonitorError::NotReady(
                    "IPFS daemon is not online".to_string(),
                ))
            }
        }
    }

    async fn submit(&self, update: StateUpdate) {
        if self.updates.send(update).await.is_err() {
            debug!("Control loop stopped, dropping state update");
        }
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn validate_key_name(name: &str) -> Result<(), MonitorError> {
    if name.trim().is_empty() {
        return Err(MonitorError::Ipfs("key name must not be empty".to_string()));
    }
    if name == SELF_KEY {
        return Err(MonitorError::Ipfs(format!(
            "`{SELF_KEY}` is the node identity key"
        )));
    }
    Ok(())
}
