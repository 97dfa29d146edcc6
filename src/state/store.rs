use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Notify};
use tracing::{debug, info};

use crate::ipfs_client::{BandwidthSample, Ports, StatusSnapshot};

use super::phase::{DaemonPhase, Liveness};
use super::view::{StatusView, WindowKind};

/// Result of one poll tick, tagged with the epoch it was started in.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub epoch: u64,
    pub liveness: Liveness,
    pub snapshot: StatusSnapshot,
    pub sample: Option<BandwidthSample>,
}

/// Shared, observable daemon status.
///
/// Readers get whole [`StatusView`] values through a `watch` channel, so a
/// snapshot is never observed half-updated and producers never wait on
/// slow subscribers. Mutation is crate-private: only the control loop
/// applies changes.
#[derive(Clone)]
pub struct StatusState {
    inner: Arc<Inner>,
}

struct Inner {
    view: watch::Sender<StatusView>,
    consumers: watch::Sender<usize>,
    epoch: watch::Sender<u64>,
    refresh: Notify,
}

impl StatusState {
    pub fn new(ports: Ports, retention: usize) -> Self {
        let (view, _) = watch::channel(StatusView::new(ports, retention));
        let (consumers, _) = watch::channel(0usize);
        let (epoch, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(Inner {
                view,
                consumers,
                epoch,
                refresh: Notify::new(),
            }),
        }
    }

    /// Current view (cheap: snapshot and history are behind `Arc`s).
    pub fn current(&self) -> StatusView {
        self.inner.view.borrow().clone()
    }

    pub fn snapshot(&self) -> Arc<StatusSnapshot> {
        Arc::clone(&self.inner.view.borrow().snapshot)
    }

    pub fn phase(&self) -> DaemonPhase {
        self.inner.view.borrow().phase
    }

    pub fn ports(&self) -> Ports {
        self.inner.view.borrow().ports
    }

    pub fn gateway_url(&self) -> String {
        self.ports().gateway_url()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusView> {
        self.inner.view.subscribe()
    }

    /// Register a UI consumer. The poller only runs while at least one
    /// guard is alive.
    pub fn register_consumer(&self) -> ConsumerGuard {
        self.inner.consumers.send_modify(|count| *count += 1);
        ConsumerGuard {
            state: self.clone(),
        }
    }

    pub fn consumer_count(&self) -> usize {
        *self.inner.consumers.borrow()
    }

    /// Ask the poller for a tick now instead of at the next interval.
    pub fn request_refresh(&self) {
        self.inner.refresh.notify_one();
    }

    pub(crate) async fn refresh_requested(&self) {
        self.inner.refresh.notified().await;
    }

    pub(crate) fn subscribe_consumers(&self) -> watch::Receiver<usize> {
        self.inner.consumers.subscribe()
    }

    pub(crate) fn epoch(&self) -> u64 {
        *self.inner.epoch.borrow()
    }

    pub(crate) fn subscribe_epoch(&self) -> watch::Receiver<u64> {
        self.inner.epoch.subscribe()
    }

    /// Abort the in-flight poll and discard any tick started before now.
    pub(crate) fn invalidate_polls(&self) -> u64 {
        self.inner.epoch.send_modify(|epoch| *epoch += 1);
        let epoch = self.epoch();
        debug!(epoch, "Invalidated in-flight polls");
        epoch
    }

    /// Apply a poll result. Returns `false` if the tick was stale.
    pub(crate) fn apply_tick(&self, tick: TickReport) -> bool {
        let current_epoch = self.epoch();
        if tick.epoch != current_epoch {
            debug!(
                tick_epoch = tick.epoch,
                current_epoch, "Discarding poll result from an invalidated epoch"
            );
            return false;
        }

        self.inner.view.send_modify(|view| {
            let mut snapshot = tick.snapshot;
            if snapshot.captured_at < view.snapshot.captured_at {
                snapshot.captured_at = view.snapshot.captured_at;
            }
            if snapshot.repo_size_bytes.is_none() {
                snapshot.repo_size_bytes = view.snapshot.repo_size_bytes;
            }

            let next_phase = view.phase.observe(tick.liveness);
            if next_phase != view.phase {
                info!(from = ?view.phase, to = ?next_phase, "Daemon phase changed");
            }
            view.phase = next_phase;
            if snapshot.online {
                view.not_running_reason = None;
            }
            view.snapshot = Arc::new(snapshot);

            if let Some(sample) = tick.sample {
                if !Arc::make_mut(&mut view.bandwidth).append(sample) {
                    debug!(timestamp = sample.timestamp, "Dropped out-of-order bandwidth sample");
                }
            }
        });
        true
    }

    pub(crate) fn set_phase(&self, phase: DaemonPhase) {
        self.inner.view.send_if_modified(|view| {
            if view.phase == phase {
                return false;
            }
            info!(from = ?view.phase, to = ?phase, "Daemon phase changed");
            view.phase = phase;
            true
        });
    }

    /// Publish an offline snapshot and the `Offline` phase together.
    pub(crate) fn mark_offline(&self, at: DateTime<Utc>) {
        self.inner.view.send_modify(|view| {
            let mut snapshot = StatusSnapshot::offline(at.max(view.snapshot.captured_at));
            snapshot.repo_size_bytes = view.snapshot.repo_size_bytes;
            view.snapshot = Arc::new(snapshot);
            if view.phase != DaemonPhase::Offline {
                info!(from = ?view.phase, "Daemon phase changed to Offline");
            }
            view.phase = DaemonPhase::Offline;
        });
    }

    pub(crate) fn set_ports(&self, ports: Ports) {
        self.inner.view.send_if_modified(|view| {
            if view.ports == ports {
                return false;
            }
            view.ports = ports;
            true
        });
    }

    pub(crate) fn set_window_visible(&self, window: WindowKind, visible: bool) {
        self.inner.view.send_if_modified(|view| {
            if view.windows.is_visible(window) == visible {
                return false;
            }
            view.windows.set(window, visible);
            true
        });
    }

    pub(crate) fn set_not_running_reason(&self, reason: Option<String>) {
        self.inner.view.send_modify(|view| view.not_running_reason = reason);
    }
}

/// Keeps the poller active while alive.
pub struct ConsumerGuard {
    state: StatusState,
}

impl Drop for ConsumerGuard {
    fn drop(&mut self) {
        self.state
            .inner
            .consumers
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}
