pub mod api;
mod client;
mod core;
pub mod helpers;
pub mod models;

pub use client::IpfsClient;
pub use self::core::NodeProbe;
pub use helpers::{format_byte_count, format_rate};
pub use models::{BandwidthHistory, BandwidthSample, Ports, RateTracker, StatusSnapshot};
