mod bandwidth;
mod ports;
mod snapshot;

pub use bandwidth::{compute_rate, BandwidthHistory, BandwidthSample, RateTracker};
pub use ports::Ports;
pub use snapshot::StatusSnapshot;
