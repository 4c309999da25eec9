//! Monitoring configuration

use std::path::PathBuf;

/// Configuration for the drift-monitoring core.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Capacity of the production buffer (records kept for analysis)
    pub buffer_capacity: usize,
    /// Seconds between scheduled analysis runs
    pub interval_secs: u64,
    /// Minimum number of buffered records required before a run analyzes
    pub min_samples: usize,
    /// Directory where drift reports are persisted
    pub reports_dir: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: std::env::var("BUFFER_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(500),
            interval_secs: std::env::var("DRIFT_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            min_samples: std::env::var("MIN_SAMPLES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            reports_dir: std::env::var("REPORTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./reports")),
        }
    }
}
