//! Two-sample drift detectors
//!
//! Deterministic distributional-distance tests between a reference column
//! and a production window column. No randomness anywhere in the comparison
//! step: identical inputs produce identical outcomes.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Outcome of a single detector on a single feature.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectorOutcome {
    pub score: f64,
    pub threshold: f64,
    pub drifted: bool,
}

fn sort_values(data: &[f64]) -> Vec<f64> {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Two-sample Kolmogorov-Smirnov test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KolmogorovSmirnov {
    alpha: f64,
}

impl KolmogorovSmirnov {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.001, 0.5),
        }
    }

    /// Approximate critical value for the two-sample statistic.
    fn critical_value(&self, n1: usize, n2: usize) -> f64 {
        let c_alpha = match self.alpha {
            a if a <= 0.01 => 1.63,
            a if a <= 0.05 => 1.36,
            a if a <= 0.10 => 1.22,
            _ => 1.07,
        };

        c_alpha * ((n1 + n2) as f64 / (n1 * n2) as f64).sqrt()
    }

    fn ecdf(sorted: &[f64], x: f64) -> f64 {
        let count = sorted.iter().filter(|&&v| v <= x).count();
        count as f64 / sorted.len() as f64
    }

    pub fn detect(&self, reference: &[f64], window: &[f64]) -> DetectorOutcome {
        let ref_sorted = sort_values(reference);
        let win_sorted = sort_values(window);

        // Maximum absolute difference between the two empirical CDFs,
        // evaluated at every distinct observed value.
        let mut combined: Vec<f64> = ref_sorted
            .iter()
            .chain(win_sorted.iter())
            .copied()
            .collect();
        combined.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        combined.dedup();

        let statistic = combined
            .iter()
            .map(|&x| (Self::ecdf(&ref_sorted, x) - Self::ecdf(&win_sorted, x)).abs())
            .fold(0.0, f64::max);

        let threshold = self.critical_value(reference.len(), window.len());

        DetectorOutcome {
            score: statistic,
            threshold,
            drifted: statistic > threshold,
        }
    }
}

impl Default for KolmogorovSmirnov {
    fn default() -> Self {
        Self::new(0.05)
    }
}

/// Population Stability Index over reference-quantile bins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationStability {
    n_bins: usize,
    critical_threshold: f64,
}

impl PopulationStability {
    pub fn new(n_bins: usize) -> Self {
        Self {
            n_bins: n_bins.max(5),
            critical_threshold: 0.2,
        }
    }

    pub fn with_threshold(mut self, critical: f64) -> Self {
        self.critical_threshold = critical.max(0.0);
        self
    }

    /// Bin edges at reference quantiles, open at both ends.
    fn bin_edges(&self, reference: &[f64]) -> Vec<f64> {
        let sorted = sort_values(reference);

        let mut edges = Vec::with_capacity(self.n_bins + 1);
        edges.push(f64::NEG_INFINITY);
        for i in 1..self.n_bins {
            let idx = (i * sorted.len()) / self.n_bins;
            edges.push(sorted[idx]);
        }
        edges.push(f64::INFINITY);
        edges
    }

    /// Per-bin proportions, floored at a small epsilon so the log ratio
    /// stays finite for empty bins.
    fn bin_proportions(&self, data: &[f64], edges: &[f64]) -> Vec<f64> {
        let n = data.len() as f64;
        let mut counts = vec![0usize; self.n_bins];

        for &value in data {
            for i in 0..self.n_bins {
                if value > edges[i] && value <= edges[i + 1] {
                    counts[i] += 1;
                    break;
                }
            }
        }

        counts
            .iter()
            .map(|&c| (c as f64 / n).max(0.0001))
            .collect()
    }

    pub fn detect(&self, reference: &[f64], window: &[f64]) -> DetectorOutcome {
        let edges = self.bin_edges(reference);
        let ref_props = self.bin_proportions(reference, &edges);
        let win_props = self.bin_proportions(window, &edges);

        let psi: f64 = ref_props
            .iter()
            .zip(win_props.iter())
            .map(|(&p_ref, &p_win)| (p_win - p_ref) * (p_win / p_ref).ln())
            .sum();

        DetectorOutcome {
            score: psi,
            threshold: self.critical_threshold,
            drifted: psi > self.critical_threshold,
        }
    }
}

impl Default for PopulationStability {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ks_no_drift_on_shifted_half_step() {
        let reference = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let window = vec![1.5, 2.5, 3.5, 4.5, 5.5, 6.5, 7.5, 8.5, 9.5, 10.5];

        let outcome = KolmogorovSmirnov::new(0.05).detect(&reference, &window);
        assert!(!outcome.drifted);
    }

    #[test]
    fn test_ks_detects_disjoint_distributions() {
        let reference = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let window = vec![
            100.0, 110.0, 120.0, 130.0, 140.0, 150.0, 160.0, 170.0, 180.0, 190.0,
        ];

        let outcome = KolmogorovSmirnov::new(0.05).detect(&reference, &window);
        assert!(outcome.drifted);
        assert!((outcome.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_psi_low_for_similar_distributions() {
        let reference: Vec<f64> = (0..200).map(|i| (i % 10) as f64).collect();
        let window: Vec<f64> = (0..200).map(|i| ((i + 1) % 10) as f64).collect();

        let outcome = PopulationStability::new(10).detect(&reference, &window);
        assert!(outcome.score < 0.2);
        assert!(!outcome.drifted);
    }

    #[test]
    fn test_psi_high_for_shifted_distribution() {
        let reference: Vec<f64> = (0..200).map(|i| (i % 10) as f64).collect();
        let window: Vec<f64> = (0..200).map(|i| 100.0 + (i % 10) as f64).collect();

        let outcome = PopulationStability::new(10).detect(&reference, &window);
        assert!(outcome.drifted);
    }

    #[test]
    fn test_detectors_are_deterministic() {
        let reference: Vec<f64> = (0..50).map(|i| (i as f64).sin() * 3.0).collect();
        let window: Vec<f64> = (0..20).map(|i| (i as f64).cos() * 3.0).collect();

        let ks = KolmogorovSmirnov::default();
        let psi = PopulationStability::default();

        let a = (ks.detect(&reference, &window), psi.detect(&reference, &window));
        let b = (ks.detect(&reference, &window), psi.detect(&reference, &window));

        assert_eq!(a.0.score.to_bits(), b.0.score.to_bits());
        assert_eq!(a.1.score.to_bits(), b.1.score.to_bits());
    }
}
