pub mod config;
pub mod daemon;
pub mod ipfs_client;
pub mod monitor;
pub mod persistence;
pub mod poller;
pub mod state;
pub mod types;

pub use config::Config;
pub use monitor::Monitor;
pub use state::{DaemonPhase, StatusState, StatusView, WindowKind};
pub use types::MonitorError;
