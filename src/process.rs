//! Process-global metrics merged into every exposition.
//!
//! These describe the exporter itself rather than the database: build
//! info, process start time, and how many collection rounds have been
//! served. They are concatenated with the collector's output on every
//! request.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::exposition::Observation;

/// Process-intrinsic metrics source.
pub struct ProcessMetrics {
    version: &'static str,
    start_time_seconds: f64,
    scrapes: AtomicU64,
}

/// Shareable handle.
pub type SharedProcessMetrics = Arc<ProcessMetrics>;

impl ProcessMetrics {
    /// Capture the process start time.
    pub fn new() -> Self {
        let start_time_seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Self {
            version: env!("CARGO_PKG_VERSION"),
            start_time_seconds,
            scrapes: AtomicU64::new(0),
        }
    }

    /// Count one served collection round.
    pub fn record_scrape(&self) {
        self.scrapes.fetch_add(1, Ordering::Relaxed);
    }

    /// Current observations for this source.
    pub fn observations(&self) -> Vec<Observation> {
        vec![
            Observation::gauge(
                "mysqld_exporter_build_info",
                "Build information for the exporter.",
                1.0,
            )
            .with_label("version", self.version),
            Observation::gauge(
                "process_start_time_seconds",
                "Start time of the process since unix epoch in seconds.",
                self.start_time_seconds,
            ),
            Observation::counter(
                "mysqld_exporter_scrapes_total",
                "Total collection rounds served by this exporter.",
                self.scrapes.load(Ordering::Relaxed) as f64,
            ),
        ]
    }
}

impl Default for ProcessMetrics {
    fn default() -> Self {
        Self::new()
    }
}
