use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ipfs_client::Ports;

use super::phase::DaemonPhase;
use super::store::{StatusState, TickReport};
use super::view::WindowKind;

/// Capacity of the control queue.
pub const CONTROL_QUEUE_CAPACITY: usize = 64;

/// A state change submitted to the control loop.
#[derive(Debug, Clone)]
pub enum StateUpdate {
    Tick(TickReport),
    Phase(DaemonPhase),
    Offline { at: DateTime<Utc> },
    Ports(Ports),
    Window { window: WindowKind, visible: bool },
    NotRunningReason(Option<String>),
}

pub type StateUpdateSender = mpsc::Sender<StateUpdate>;

pub fn control_channel() -> (StateUpdateSender, mpsc::Receiver<StateUpdate>) {
    mpsc::channel(CONTROL_QUEUE_CAPACITY)
}

/// Spawn the single task that applies every [`StateUpdate`], in
/// submission order.
pub fn spawn_control_loop(
    state: StatusState,
    rx: mpsc::Receiver<StateUpdate>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(control_loop(state, rx, cancel))
}

async fn control_loop(
    state: StatusState,
    mut rx: mpsc::Receiver<StateUpdate>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                // Updates already queued were submitted before the stop.
                while let Ok(update) = rx.try_recv() {
                    apply(&state, update);
                }
                break;
            }
            update = rx.recv() => {
                let Some(update) = update else { break };
                apply(&state, update);
            }
        }
    }
    debug!("Control loop stopped");
}

pub(crate) fn apply(state: &StatusState, update: StateUpdate) {
    match update {
        StateUpdate::Tick(tick) => {
            state.apply_tick(tick);
        }
        StateUpdate::Phase(phase) => state.set_phase(phase),
        StateUpdate::Offline { at } => state.mark_offline(at),
        StateUpdate::Ports(ports) => state.set_ports(ports),
        StateUpdate::Window { window, visible } => state.set_window_visible(window, visible),
        StateUpdate::NotRunningReason(reason) => state.set_not_running_reason(reason),
    }
}
