//! Periodic status polling of the local node.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::daemon::DaemonControl;
use crate::ipfs_client::api::NodeReport;
use crate::ipfs_client::{IpfsClient, NodeProbe, RateTracker, StatusSnapshot};
use crate::state::{Liveness, StateUpdate, StateUpdateSender, StatusState, TickReport};

enum Trigger {
    Interval,
    Refresh,
    Suspend,
}

enum QueryOutcome {
    Report(NodeReport),
    Failed,
    Aborted,
}

/// Turns supervisor liveness and node API answers into [`TickReport`]s.
pub struct Poller {
    state: StatusState,
    daemon: Arc<dyn DaemonControl>,
    http: Client,
    updates: StateUpdateSender,
    poll_interval: Duration,
    query_timeout: Duration,
    repo_stat_every: u64,
    tracker: RateTracker,
    ticks: u64,
}

impl Poller {
    pub fn new(
        state: StatusState,
        daemon: Arc<dyn DaemonControl>,
        http: Client,
        updates: StateUpdateSender,
        config: &Config,
    ) -> Self {
        Self {
            state,
            daemon,
            http,
            updates,
            poll_interval: config.poll_interval(),
            query_timeout: config.query_timeout(),
            repo_stat_every: u64::from(config.repo_stat_every_ticks.max(1)),
            tracker: RateTracker::new(),
            ticks: 0,
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Poll until cancelled. Parks while no consumer is registered.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut consumers = self.state.subscribe_consumers();
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Status poller started"
        );

        loop {
            if *consumers.borrow_and_update() == 0 {
                debug!("No status consumers, poller suspended");
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = wait_for_consumers(&mut consumers) => {}
                }
                debug!("Status consumer registered, poller resumed");
                interval.reset_immediately();
                continue;
            }

            let trigger = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = wait_for_no_consumers(&mut consumers) => Trigger::Suspend,
                () = self.state.refresh_requested() => Trigger::Refresh,
                _ = interval.tick() => Trigger::Interval,
            };

            match trigger {
                Trigger::Suspend => continue,
                Trigger::Refresh => {
                    debug!("Status refresh requested");
                    interval.reset();
                }
                Trigger::Interval => {}
            }

            if !self.tick(&cancel).await {
                break;
            }
        }
        info!("Status poller stopped");
    }

    /// One poll. Returns `false` once the poller should stop.
    async fn tick(&mut self, cancel: &CancellationToken) -> bool {
        let epoch = self.state.epoch();
        let include_repo_size = self.ticks % self.repo_stat_every == 0;
        self.ticks = self.ticks.wrapping_add(1);

        let process_running = self.daemon.is_running();
        let outcome = if process_running {
            let client = IpfsClient::new(self.http.clone(), self.state.ports().api);
            let probe = NodeProbe::new(&client);
            let epochs = self.state.subscribe_epoch();
            tokio::select! {
                biased;
                () = cancel.cancelled() => return false,
                () = wait_for_epoch_change(epochs, epoch) => QueryOutcome::Aborted,
                result = tokio::time::timeout(self.query_timeout, probe.collect(include_repo_size)) => {
                    match result {
                        Ok(Ok(report)) => QueryOutcome::Report(report),
                        Ok(Err(err)) => {
                            if err.is_transient() {
                                debug!(error = ?err, "IPFS API not reachable");
                            } else {
                                warn!(error = ?err, "Failed to query IPFS status");
                            }
                            QueryOutcome::Failed
                        }
                        Err(_) => {
                            warn!(
                                timeout_secs = self.query_timeout.as_secs(),
                                "IPFS status query timed out"
                            );
                            QueryOutcome::Failed
                        }
                    }
                }
            }
        } else {
            QueryOutcome::Failed
        };

        let now = Utc::now();
        let (snapshot, sample) = match outcome {
            QueryOutcome::Aborted => {
                debug!(epoch, "Status query aborted by invalidation");
                return true;
            }
            QueryOutcome::Report(report) => {
                let sample = report
                    .bandwidth
                    .map(|bw| self.tracker.observe(bw.total_in, bw.total_out, now));
                (StatusSnapshot::from_report(&report, now), sample)
            }
            QueryOutcome::Failed => {
                self.tracker.reset();
                (StatusSnapshot::offline(now), None)
            }
        };

        let tick = TickReport {
            epoch,
            liveness: Liveness {
                process_running,
                api_online: snapshot.online,
            },
            snapshot,
            sample,
        };
        if self.updates.send(StateUpdate::Tick(tick)).await.is_err() {
            debug!("Control loop gone, stopping poller");
            return false;
        }
        true
    }
}

async fn wait_for_consumers(consumers: &mut watch::Receiver<usize>) {
    while *consumers.borrow_and_update() == 0 {
        if consumers.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn wait_for_no_consumers(consumers: &mut watch::Receiver<usize>) {
    while *consumers.borrow_and_update() > 0 {
        if consumers.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn wait_for_epoch_change(mut epochs: watch::Receiver<u64>, epoch: u64) {
    while *epochs.borrow_and_update() == epoch {
        if epochs.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
