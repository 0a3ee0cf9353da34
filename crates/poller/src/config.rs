// crates/poller/src/config.rs
//! Poller configuration.

use std::ops::RangeInclusive;
use std::time::Duration;

use crate::dialect::Dialect;

/// Configuration shared by every subscription a poller starts.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Fixed interval between status fetches per target.
    pub poll_interval: Duration,
    /// Path of the status endpoint on each target.
    pub metrics_path: String,
    /// Control-command wire dialect spoken by the targets.
    pub dialect: Dialect,
    /// Bounds applied client-side to thread-count updates before submission.
    pub thread_bounds: RangeInclusive<u32>,
    /// Per-request timeout. A timed-out fetch counts as transient, not gone.
    pub request_timeout: Duration,
    /// Ask for the reduced `?concise` payload once a job's totals are known.
    pub concise: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5000),
            metrics_path: "/metrics".to_string(),
            dialect: Dialect::default(),
            thread_bounds: 1..=64,
            request_timeout: Duration::from_secs(10),
            concise: false,
        }
    }
}
