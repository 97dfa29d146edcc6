mod control;
mod phase;
mod store;
mod view;

pub use control::{control_channel, spawn_control_loop, StateUpdate, StateUpdateSender};
pub use phase::{DaemonPhase, Liveness};
pub use store::{ConsumerGuard, StatusState, TickReport};
pub use view::{StatusView, WindowKind, WindowVisibility};
