//! Production buffer
//!
//! Bounded FIFO window over the most recent inference inputs. Request
//! handlers append from many concurrent callers; the scheduler reads
//! point-in-time snapshots for analysis. The lock is scoped to the
//! append+evict step and to the copy inside `snapshot`, so analysis
//! duration never blocks the serving path.

use std::collections::BTreeMap;
use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A single inference input plus the prediction it produced.
///
/// The feature map is deterministically ordered by feature name. Records are
/// immutable once constructed; the buffer takes ownership on insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    values: BTreeMap<String, f64>,
    prediction: Option<i64>,
}

impl FeatureRecord {
    pub fn new(values: BTreeMap<String, f64>) -> Self {
        Self {
            values,
            prediction: None,
        }
    }

    pub fn with_prediction(mut self, class_id: i64) -> Self {
        self.prediction = Some(class_id);
        self
    }

    /// Look up a feature value by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }

    pub fn prediction(&self) -> Option<i64> {
        self.prediction
    }
}

/// Bounded rolling window of recent inference records.
///
/// Invariant: `len() <= capacity` always; appending at capacity evicts the
/// oldest record first (strict FIFO).
pub struct ProductionBuffer {
    capacity: usize,
    records: Mutex<VecDeque<FeatureRecord>>,
}

impl ProductionBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append a record, evicting the oldest when at capacity.
    pub fn append(&self, record: FeatureRecord) {
        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Independent point-in-time copy of the current contents.
    ///
    /// The copy is taken under the same brief lock as `append`; callers can
    /// analyze it for arbitrarily long while appends continue.
    pub fn snapshot(&self) -> Vec<FeatureRecord> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
