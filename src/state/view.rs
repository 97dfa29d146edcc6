use std::sync::Arc;

use serde::Serialize;

use crate::ipfs_client::{BandwidthHistory, Ports, StatusSnapshot};

use super::phase::DaemonPhase;

/// Floating windows whose visibility and position are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Status,
    Console,
}

impl WindowKind {
    pub fn key(self) -> &'static str {
        match self {
            WindowKind::Status => "status",
            WindowKind::Console => "console",
        }
    }
}

/// Independent visibility flags; both windows may be open at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WindowVisibility {
    pub status: bool,
    pub console: bool,
}

impl WindowVisibility {
    pub fn is_visible(&self, window: WindowKind) -> bool {
        match window {
            WindowKind::Status => self.status,
            WindowKind::Console => self.console,
        }
    }

    pub(crate) fn set(&mut self, window: WindowKind, visible: bool) {
        match window {
            WindowKind::Status => self.status = visible,
            WindowKind::Console => self.console = visible,
        }
    }
}

/// Everything a UI consumer reads, published as one value.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub snapshot: Arc<StatusSnapshot>,
    pub bandwidth: Arc<BandwidthHistory>,
    pub phase: DaemonPhase,
    pub ports: Ports,
    pub windows: WindowVisibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_running_reason: Option<String>,
}

impl StatusView {
    pub(crate) fn new(ports: Ports, retention: usize) -> Self {
        Self {
            snapshot: Arc::new(StatusSnapshot::default()),
            bandwidth: Arc::new(BandwidthHistory::new(retention)),
            phase: DaemonPhase::Offline,
            ports,
            windows: WindowVisibility::default(),
            not_running_reason: None,
        }
    }

    pub fn online(&self) -> bool {
        self.snapshot.online
    }

    pub fn is_operating(&self) -> bool {
        self.phase.is_operating()
    }

    pub fn gateway_url(&self) -> String {
        self.ports.gateway_url()
    }
}
