//! Inference engine
//!
//! Owns the serving classifier and the serving metrics. The model itself is
//! deliberately small: a nearest-centroid classifier fit once on the
//! reference baseline at startup. The monitoring core only depends on the
//! engine producing a prediction per request; swapping the classifier does
//! not touch buffer, scheduler, or report store.

use std::collections::BTreeMap;
use std::time::Instant;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::baseline::ReferenceBaseline;
use crate::error::{MonitorError, Result};
use crate::monitoring::ServingMetrics;

/// A single prediction result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub class: String,
    pub class_id: i64,
}

/// Nearest-centroid classifier.
///
/// Stores one mean vector per class; prediction is the class whose centroid
/// is closest in Euclidean distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentroidClassifier {
    centroids: Array2<f64>,
    classes: Vec<i64>,
}

impl CentroidClassifier {
    pub fn fit(x: &Array2<f64>, y: &Array1<i64>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(MonitorError::Validation(format!(
                "feature matrix has {} rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() == 0 {
            return Err(MonitorError::Validation(
                "cannot fit on an empty dataset".to_string(),
            ));
        }

        let mut classes: Vec<i64> = y.iter().copied().collect();
        classes.sort_unstable();
        classes.dedup();

        let mut centroids = Array2::zeros((classes.len(), x.ncols()));
        for (class_idx, &class) in classes.iter().enumerate() {
            let rows: Vec<usize> = y
                .iter()
                .enumerate()
                .filter(|(_, &label)| label == class)
                .map(|(i, _)| i)
                .collect();

            for col in 0..x.ncols() {
                let sum: f64 = rows.iter().map(|&r| x[[r, col]]).sum();
                centroids[[class_idx, col]] = sum / rows.len() as f64;
            }
        }

        Ok(Self { centroids, classes })
    }

    /// Predict the class id for one feature vector.
    pub fn predict(&self, features: &[f64]) -> Result<i64> {
        if features.len() != self.centroids.ncols() {
            return Err(MonitorError::Validation(format!(
                "expected {} features, got {}",
                self.centroids.ncols(),
                features.len()
            )));
        }

        let mut best = (0usize, f64::INFINITY);
        for (idx, centroid) in self.centroids.rows().into_iter().enumerate() {
            let dist: f64 = centroid
                .iter()
                .zip(features.iter())
                .map(|(c, f)| (c - f).powi(2))
                .sum();
            if dist < best.1 {
                best = (idx, dist);
            }
        }

        Ok(self.classes[best.0])
    }
}

/// Serving-side engine: validates request shape, predicts, records latency.
pub struct InferenceEngine {
    classifier: CentroidClassifier,
    feature_names: Vec<String>,
    class_names: Vec<String>,
    metrics: ServingMetrics,
}

impl InferenceEngine {
    /// Fit the bundled classifier on the reference baseline.
    pub fn from_baseline(baseline: &ReferenceBaseline) -> Result<Self> {
        let classifier = CentroidClassifier::fit(baseline.data(), baseline.targets())?;
        Ok(Self {
            classifier,
            feature_names: baseline.feature_names().to_vec(),
            class_names: baseline.class_names().to_vec(),
            metrics: ServingMetrics::default(),
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn metrics(&self) -> &ServingMetrics {
        &self.metrics
    }

    /// Predict from a feature map.
    ///
    /// The map must contain every feature the model was fit on; extra keys
    /// are ignored. Failures are request-local and recorded as serving
    /// errors without touching any monitoring state.
    pub fn predict(&self, values: &BTreeMap<String, f64>) -> Result<Prediction> {
        let start = Instant::now();

        let features: Vec<f64> = self
            .feature_names
            .iter()
            .map(|name| {
                values.get(name).copied().ok_or_else(|| {
                    MonitorError::Validation(format!("missing feature '{}'", name))
                })
            })
            .collect::<Result<_>>()
            .inspect_err(|_| self.metrics.record_error())?;

        let class_id = self
            .classifier
            .predict(&features)
            .inspect_err(|_| self.metrics.record_error())?;

        let class = self
            .class_names
            .get(class_id as usize)
            .cloned()
            .unwrap_or_else(|| class_id.to_string());

        self.metrics
            .record_latency(start.elapsed().as_secs_f64() * 1000.0);

        Ok(Prediction { class, class_id })
    }
}
