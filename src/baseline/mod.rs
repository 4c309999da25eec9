//! Reference baseline
//!
//! Immutable snapshot of the known-good feature distribution, computed once
//! at process start and shared read-only by every analysis run.

use ndarray::{Array1, Array2, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{MonitorError, Result};

/// Seed for the bundled reference dataset. Fixed so every process start
/// produces the same baseline and identical analysis inputs yield identical
/// reports.
const REFERENCE_SEED: u64 = 42;

/// The fixed reference distribution drift is measured against.
///
/// Carries the canonical feature-name list (the set compared by the
/// analyzer), the reference feature matrix, and the labels used to fit the
/// serving classifier. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct ReferenceBaseline {
    feature_names: Vec<String>,
    data: Array2<f64>,
    targets: Array1<i64>,
    class_names: Vec<String>,
}

impl ReferenceBaseline {
    pub fn new(
        feature_names: Vec<String>,
        data: Array2<f64>,
        targets: Array1<i64>,
        class_names: Vec<String>,
    ) -> Result<Self> {
        if data.ncols() != feature_names.len() {
            return Err(MonitorError::Validation(format!(
                "baseline has {} columns but {} feature names",
                data.ncols(),
                feature_names.len()
            )));
        }
        if data.nrows() != targets.len() {
            return Err(MonitorError::Validation(format!(
                "baseline has {} rows but {} targets",
                data.nrows(),
                targets.len()
            )));
        }
        Ok(Self {
            feature_names,
            data,
            targets,
            class_names,
        })
    }

    /// Build the bundled iris reference dataset: 150 rows, 4 features,
    /// 3 balanced classes, generated from a fixed seed.
    pub fn iris() -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(REFERENCE_SEED);
        let n = 150;

        let sepal_length: Vec<f64> = (0..n)
            .map(|i| {
                let base = match i / 50 {
                    0 => 5.0,
                    1 => 5.9,
                    _ => 6.6,
                };
                base + rng.gen::<f64>() * 0.8
            })
            .collect();

        let sepal_width: Vec<f64> = (0..n)
            .map(|i| {
                let base = match i / 50 {
                    0 => 3.4,
                    1 => 2.8,
                    _ => 3.0,
                };
                base + rng.gen::<f64>() * 0.5
            })
            .collect();

        let petal_length: Vec<f64> = (0..n)
            .map(|i| {
                let base = match i / 50 {
                    0 => 1.4,
                    1 => 4.3,
                    _ => 5.5,
                };
                base + rng.gen::<f64>() * 0.5
            })
            .collect();

        let petal_width: Vec<f64> = (0..n)
            .map(|i| {
                let base = match i / 50 {
                    0 => 0.2,
                    1 => 1.3,
                    _ => 2.0,
                };
                base + rng.gen::<f64>() * 0.3
            })
            .collect();

        let mut flat = Vec::with_capacity(n * 4);
        for i in 0..n {
            flat.push(sepal_length[i]);
            flat.push(sepal_width[i]);
            flat.push(petal_length[i]);
            flat.push(petal_width[i]);
        }

        let data = Array2::from_shape_vec((n, 4), flat)
            .expect("reference matrix dimensions are fixed");
        let targets = Array1::from_iter((0..n).map(|i| (i / 50) as i64));

        Self {
            feature_names: vec![
                "sepal_length".to_string(),
                "sepal_width".to_string(),
                "petal_length".to_string(),
                "petal_width".to_string(),
            ],
            data,
            targets,
            class_names: vec![
                "setosa".to_string(),
                "versicolor".to_string(),
                "virginica".to_string(),
            ],
        }
    }

    /// The canonical feature list, fixed at startup. The analyzer compares
    /// exactly these columns.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Reference values for one feature column.
    pub fn column(&self, idx: usize) -> ArrayView1<'_, f64> {
        self.data.column(idx)
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn targets(&self) -> &Array1<i64> {
        &self.targets
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn class_name(&self, class_id: i64) -> Option<&str> {
        usize::try_from(class_id)
            .ok()
            .and_then(|i| self.class_names.get(i))
            .map(|s| s.as_str())
    }

    /// Number of reference rows.
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iris_shape() {
        let baseline = ReferenceBaseline::iris();
        assert_eq!(baseline.len(), 150);
        assert_eq!(baseline.feature_names().len(), 4);
        assert_eq!(baseline.targets().len(), 150);
        assert_eq!(baseline.class_names().len(), 3);
    }

    #[test]
    fn test_iris_is_deterministic() {
        let a = ReferenceBaseline::iris();
        let b = ReferenceBaseline::iris();
        assert_eq!(a.data(), b.data());
        assert_eq!(a.targets(), b.targets());
    }

    #[test]
    fn test_class_name_lookup() {
        let baseline = ReferenceBaseline::iris();
        assert_eq!(baseline.class_name(0), Some("setosa"));
        assert_eq!(baseline.class_name(2), Some("virginica"));
        assert_eq!(baseline.class_name(3), None);
        assert_eq!(baseline.class_name(-1), None);
    }

    #[test]
    fn test_new_rejects_mismatched_shapes() {
        let data = Array2::zeros((3, 2));
        let targets = Array1::zeros(3);
        let result = ReferenceBaseline::new(
            vec!["a".to_string()],
            data,
            targets,
            vec!["c0".to_string()],
        );
        assert!(result.is_err());
    }
}
