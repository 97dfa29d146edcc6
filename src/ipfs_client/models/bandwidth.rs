use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One timestamped throughput measurement. Rates are bytes per second,
/// totals are the node's cumulative counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BandwidthSample {
    pub timestamp: i64,
    pub rate_in: u64,
    pub rate_out: u64,
    pub total_in: u64,
    pub total_out: u64,
}

/// Bounded, chronologically ordered bandwidth series keyed by unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandwidthHistory {
    samples: BTreeMap<i64, BandwidthSample>,
    #[serde(skip)]
    retention: usize,
}

impl BandwidthHistory {
    pub fn new(retention: usize) -> Self {
        Self {
            samples: BTreeMap::new(),
            retention: retention.max(1),
        }
    }

    /// Append a sample, pruning the oldest beyond the retention window.
    ///
    /// A sample older than the newest key is rejected; one with the same
    /// key replaces the existing entry. Returns whether it was stored.
    pub fn append(&mut self, sample: BandwidthSample) -> bool {
        if let Some(newest) = self.newest_timestamp() {
            if sample.timestamp < newest {
                return false;
            }
        }
        self.samples.insert(sample.timestamp, sample);
        while self.samples.len() > self.retention {
            self.samples.pop_first();
        }
        true
    }

    pub fn latest(&self) -> Option<&BandwidthSample> {
        self.samples.values().next_back()
    }

    pub fn newest_timestamp(&self) -> Option<i64> {
        self.samples.keys().next_back().copied()
    }

    /// Samples oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &BandwidthSample> {
        self.samples.values()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Highest in/out rate in the window, for chart scaling.
    pub fn peak_rate(&self) -> u64 {
        self.samples
            .values()
            .map(|s| s.rate_in.max(s.rate_out))
            .max()
            .unwrap_or(0)
    }
}

impl Default for BandwidthHistory {
    fn default() -> Self {
        Self::new(60)
    }
}

/// Rate between two cumulative counter readings.
///
/// A counter that went backwards (node restart) or a non-positive interval
/// yields 0.
pub fn compute_rate(previous_total: u64, current_total: u64, elapsed_secs: f64) -> u64 {
    if current_total < previous_total || !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
        return 0;
    }
    ((current_total - previous_total) as f64 / elapsed_secs) as u64
}

#[derive(Debug, Clone, Copy)]
struct Reading {
    total_in: u64,
    total_out: u64,
    at: DateTime<Utc>,
}

/// Turns successive counter readings into samples.
#[derive(Debug, Default)]
pub struct RateTracker {
    previous: Option<Reading>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading and build the sample for it. The first reading after
    /// construction or [`RateTracker::reset`] has zero rates.
    pub fn observe(&mut self, total_in: u64, total_out: u64, at: DateTime<Utc>) -> BandwidthSample {
        let (rate_in, rate_out) = match self.previous {
            Some(prev) => {
                let elapsed = (at - prev.at).num_milliseconds() as f64 / 1000.0;
                (
                    compute_rate(prev.total_in, total_in, elapsed),
                    compute_rate(prev.total_out, total_out, elapsed),
                )
            }
            None => (0, 0),
        };
        self.previous = Some(Reading {
            total_in,
            total_out,
            at,
        });
        BandwidthSample {
            timestamp: at.timestamp(),
            rate_in,
            rate_out,
            total_in,
            total_out,
        }
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}
