mod setup;
mod supervisor;
mod system;
mod types;

pub use setup::{is_port_free, scout_port, RepoSetup, API_PORT_RANGE, GATEWAY_PORT_RANGE, SWARM_PORT_RANGE};
pub use supervisor::DaemonSupervisor;
pub use system::run_ipfs;
pub use types::{DaemonCommand, DaemonControl, LaunchOutcome, READY_MARKER};
