//! Serving metrics
//!
//! Rolling latency window and lock-free counters for the prediction path.
//! Read-only consumers (the status endpoint) see a consistent snapshot;
//! recording is cheap enough to sit inline in the request handler.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Snapshot of serving-path statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingStats {
    pub total_predictions: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub uptime_secs: f64,
}

/// Latency and error tracking for the serving endpoint.
pub struct ServingMetrics {
    window_size: usize,
    latencies: RwLock<VecDeque<f64>>,
    total_predictions: AtomicU64,
    total_errors: AtomicU64,
    start_time: Instant,
}

impl ServingMetrics {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            latencies: RwLock::new(VecDeque::with_capacity(window_size)),
            total_predictions: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction and its latency.
    pub fn record_latency(&self, latency_ms: f64) {
        let mut latencies = self.latencies.write();
        latencies.push_back(latency_ms);
        if latencies.len() > self.window_size {
            latencies.pop_front();
        }
        drop(latencies);

        self.total_predictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_predictions(&self) -> u64 {
        self.total_predictions.load(Ordering::Relaxed)
    }

    pub fn total_errors(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> ServingStats {
        let latencies = self.latencies.read();
        let values: Vec<f64> = latencies.iter().copied().collect();
        drop(latencies);

        let avg = if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        };

        ServingStats {
            total_predictions: self.total_predictions(),
            error_count: self.total_errors(),
            avg_latency_ms: avg,
            p95_latency_ms: percentile(&values, 0.95),
            uptime_secs: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

impl Default for ServingMetrics {
    fn default() -> Self {
        Self::new(1000)
    }
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_tracking() {
        let metrics = ServingMetrics::new(100);
        metrics.record_latency(5.0);
        metrics.record_latency(10.0);
        metrics.record_latency(15.0);

        let stats = metrics.stats();
        assert_eq!(stats.total_predictions, 3);
        assert!((stats.avg_latency_ms - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_is_bounded() {
        let metrics = ServingMetrics::new(10);
        for i in 0..100 {
            metrics.record_latency(i as f64);
        }

        let stats = metrics.stats();
        assert_eq!(stats.total_predictions, 100);
        // Window holds the last 10 observations: 90..=99
        assert!((stats.avg_latency_ms - 94.5).abs() < 1e-9);
    }

    #[test]
    fn test_error_counting() {
        let metrics = ServingMetrics::new(10);
        metrics.record_error();
        metrics.record_error();
        assert_eq!(metrics.total_errors(), 2);
    }

    #[test]
    fn test_percentile() {
        let values: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        assert!((percentile(&values, 0.95) - 95.0).abs() < 1.0);
        assert_eq!(percentile(&[], 0.95), 0.0);
    }
}
