use serde::Serialize;

/// What the poller observed about the node on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
    pub process_running: bool,
    pub api_online: bool,
}

/// Daemon lifecycle as shown to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonPhase {
    #[default]
    Offline,
    Launching,
    Online,
    ShuttingDown,
}

impl DaemonPhase {
    /// Spinner shown, toggle disabled.
    pub fn is_operating(self) -> bool {
        matches!(self, DaemonPhase::Launching | DaemonPhase::ShuttingDown)
    }

    /// Next phase after a poll tick. `ShuttingDown` only ends when the
    /// shutdown command completes.
    pub fn observe(self, liveness: Liveness) -> DaemonPhase {
        match self {
            DaemonPhase::ShuttingDown => DaemonPhase::ShuttingDown,
            _ if liveness.api_online => DaemonPhase::Online,
            DaemonPhase::Launching if liveness.process_running => DaemonPhase::Launching,
            _ => DaemonPhase::Offline,
        }
    }
}
