//! Drift analysis
//!
//! Pure comparison of a production window against the reference baseline.
//! The analyzer reads nothing but its arguments and writes nothing, so a
//! run can execute concurrently with serving without any shared state.

mod detectors;

pub use detectors::{DetectorOutcome, KolmogorovSmirnov, PopulationStability};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::baseline::ReferenceBaseline;
use crate::buffer::FeatureRecord;
use crate::error::{MonitorError, Result};

/// Drift outcome for a single compared feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDrift {
    pub feature: String,
    pub ks: DetectorOutcome,
    pub psi: DetectorOutcome,
    /// Set when both detectors vote drift.
    pub drifted: bool,
}

/// Result of comparing one window against the baseline.
///
/// Content only; the scheduler stamps the timestamp and id when it turns an
/// analysis into a persisted [`DriftReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftAnalysis {
    /// The exact feature list compared, in baseline order
    pub features: Vec<FeatureDrift>,
    pub n_drifted: usize,
    pub drift_detected: bool,
    pub ref_size: usize,
    pub window_size: usize,
}

impl DriftAnalysis {
    pub fn drifted_features(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| f.drifted)
            .map(|f| f.feature.as_str())
            .collect()
    }

    pub fn verdict(&self) -> &'static str {
        if self.drift_detected {
            "drift detected"
        } else {
            "no significant drift"
        }
    }

    /// Human-readable summary, used for logging and report headers.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!(
            "compared {} features over {} window records against {} reference rows\n",
            self.features.len(),
            self.window_size,
            self.ref_size
        ));
        s.push_str(&format!("verdict: {}\n", self.verdict()));
        if self.n_drifted > 0 {
            s.push_str("drifted features:\n");
            for f in self.features.iter().filter(|f| f.drifted) {
                s.push_str(&format!(
                    "  - {} (ks {:.4}, psi {:.4})\n",
                    f.feature, f.ks.score, f.psi.score
                ));
            }
        }
        s
    }
}

/// A completed, persisted drift analysis.
///
/// Immutable after creation; the id is derived from the generation
/// timestamp and doubles as the report file name stem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReport {
    pub id: String,
    pub generated_at: DateTime<Utc>,
    pub analysis: DriftAnalysis,
}

impl DriftReport {
    /// Stamp an analysis with the current time and a timestamp-derived id.
    pub fn new(analysis: DriftAnalysis) -> Self {
        let generated_at = Utc::now();
        Self {
            id: generated_at.format("%Y%m%d_%H%M%S%.3f").to_string(),
            generated_at,
            analysis,
        }
    }
}

/// Per-feature drift comparison between baseline and window.
///
/// Pure with respect to its inputs; identical (baseline, window) pairs
/// produce identical analyses.
#[derive(Debug, Clone)]
pub struct DriftAnalyzer {
    ks: KolmogorovSmirnov,
    psi: PopulationStability,
}

impl DriftAnalyzer {
    pub fn new() -> Self {
        Self {
            ks: KolmogorovSmirnov::default(),
            psi: PopulationStability::default(),
        }
    }

    /// Compare a window snapshot against the baseline.
    ///
    /// Callers are responsible for the minimum-samples gate; this function
    /// assumes the window is large enough to be worth comparing. A window
    /// record missing a compared feature is a [`MonitorError::SchemaMismatch`].
    pub fn analyze(
        &self,
        baseline: &ReferenceBaseline,
        window: &[FeatureRecord],
    ) -> Result<DriftAnalysis> {
        if window.is_empty() {
            return Err(MonitorError::Validation(
                "cannot analyze an empty window".to_string(),
            ));
        }

        let features: Vec<FeatureDrift> = baseline
            .feature_names()
            .par_iter()
            .enumerate()
            .map(|(idx, name)| {
                let win_col: Vec<f64> = window
                    .iter()
                    .map(|record| {
                        record.get(name).ok_or_else(|| MonitorError::SchemaMismatch {
                            feature: name.clone(),
                        })
                    })
                    .collect::<Result<_>>()?;

                let ref_col: Vec<f64> = baseline.column(idx).to_vec();

                let ks = self.ks.detect(&ref_col, &win_col);
                let psi = self.psi.detect(&ref_col, &win_col);

                Ok(FeatureDrift {
                    feature: name.clone(),
                    drifted: ks.drifted && psi.drifted,
                    ks,
                    psi,
                })
            })
            .collect::<Result<_>>()?;

        let n_drifted = features.iter().filter(|f| f.drifted).count();

        Ok(DriftAnalysis {
            drift_detected: n_drifted * 2 > features.len(),
            n_drifted,
            ref_size: baseline.len(),
            window_size: window.len(),
            features,
        })
    }
}

impl Default for DriftAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn window_from_baseline(baseline: &ReferenceBaseline, n: usize) -> Vec<FeatureRecord> {
        // Evenly strided baseline rows: the window stays empirically matched
        // to the reference distribution across all classes.
        (0..n)
            .map(|i| {
                let row = (i * 5) % baseline.len();
                let mut values = BTreeMap::new();
                for (idx, name) in baseline.feature_names().iter().enumerate() {
                    values.insert(name.clone(), baseline.data()[[row, idx]]);
                }
                FeatureRecord::new(values)
            })
            .collect()
    }

    fn shifted_window(baseline: &ReferenceBaseline, n: usize, shift: f64) -> Vec<FeatureRecord> {
        window_from_baseline(baseline, n)
            .into_iter()
            .map(|record| {
                let values = record
                    .values()
                    .iter()
                    .map(|(k, v)| (k.clone(), v + shift))
                    .collect();
                FeatureRecord::new(values)
            })
            .collect()
    }

    #[test]
    fn test_no_drift_on_baseline_resample() {
        let baseline = ReferenceBaseline::iris();
        let window = window_from_baseline(&baseline, 30);

        let analysis = DriftAnalyzer::new().analyze(&baseline, &window).unwrap();
        assert!(!analysis.drift_detected);
        assert_eq!(analysis.verdict(), "no significant drift");
        assert_eq!(analysis.window_size, 30);
        assert_eq!(analysis.ref_size, 150);
    }

    #[test]
    fn test_drift_detected_on_shifted_window() {
        let baseline = ReferenceBaseline::iris();
        let window = shifted_window(&baseline, 30, 25.0);

        let analysis = DriftAnalyzer::new().analyze(&baseline, &window).unwrap();
        assert!(analysis.drift_detected);
        assert_eq!(analysis.n_drifted, 4);
        assert_eq!(
            analysis.drifted_features(),
            vec!["sepal_length", "sepal_width", "petal_length", "petal_width"]
        );
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let baseline = ReferenceBaseline::iris();
        let window = window_from_baseline(&baseline, 15);

        let analyzer = DriftAnalyzer::new();
        let a = analyzer.analyze(&baseline, &window).unwrap();
        let b = analyzer.analyze(&baseline, &window).unwrap();

        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_schema_mismatch_on_missing_feature() {
        let baseline = ReferenceBaseline::iris();
        let mut values = BTreeMap::new();
        values.insert("sepal_length".to_string(), 5.0);
        let window = vec![FeatureRecord::new(values)];

        let err = DriftAnalyzer::new().analyze(&baseline, &window).unwrap_err();
        assert!(matches!(err, MonitorError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_empty_window_is_rejected() {
        let baseline = ReferenceBaseline::iris();
        let err = DriftAnalyzer::new().analyze(&baseline, &[]).unwrap_err();
        assert!(matches!(err, MonitorError::Validation(_)));
    }

    #[test]
    fn test_extra_window_features_are_ignored() {
        let baseline = ReferenceBaseline::iris();
        let window: Vec<FeatureRecord> = window_from_baseline(&baseline, 15)
            .into_iter()
            .map(|record| {
                let mut values = record.values().clone();
                values.insert("unrelated".to_string(), 1.0);
                FeatureRecord::new(values)
            })
            .collect();

        let analysis = DriftAnalyzer::new().analyze(&baseline, &window).unwrap();
        assert_eq!(analysis.features.len(), 4);
    }

    #[test]
    fn test_report_id_derives_from_timestamp() {
        let baseline = ReferenceBaseline::iris();
        let window = window_from_baseline(&baseline, 15);
        let analysis = DriftAnalyzer::new().analyze(&baseline, &window).unwrap();

        let report = DriftReport::new(analysis);
        assert_eq!(
            report.id,
            report.generated_at.format("%Y%m%d_%H%M%S%.3f").to_string()
        );
    }
}
