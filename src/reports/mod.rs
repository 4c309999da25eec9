//! Report store
//!
//! Append-only persistence for drift reports. Each report lands in the
//! reports directory as `drift_report_<id>.json`, and a fixed
//! `drift_report_latest.json` pointer is rewritten only after the
//! timestamped file is durably in place. Writes go through a temp file and
//! rename so readers never observe a half-written report; a failed append
//! leaves the previous latest pointer intact.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::drift::DriftReport;
use crate::error::{MonitorError, Result};

const REPORT_PREFIX: &str = "drift_report_";
const REPORT_SUFFIX: &str = ".json";
const LATEST_NAME: &str = "drift_report_latest.json";

/// Metadata for one persisted report file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub id: String,
    pub name: String,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

/// Durable, append-only log of drift reports plus the latest pointer.
pub struct ReportStore {
    dir: PathBuf,
    index: RwLock<Vec<ReportMeta>>,
    latest: RwLock<Option<DriftReport>>,
}

impl ReportStore {
    /// Open (or create) a report directory and rebuild the index from any
    /// reports already on disk, so history survives restarts.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut index = Self::rescan(&dir)?;
        // Timestamp-derived ids are zero-padded, so name order is
        // chronological order.
        index.sort_by(|a, b| a.id.cmp(&b.id));

        let latest = Self::load_latest(&dir);

        Ok(Self {
            dir,
            index: RwLock::new(index),
            latest: RwLock::new(latest),
        })
    }

    fn rescan(dir: &Path) -> Result<Vec<ReportMeta>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name == LATEST_NAME
                || !name.starts_with(REPORT_PREFIX)
                || !name.ends_with(REPORT_SUFFIX)
            {
                continue;
            }

            let id = name[REPORT_PREFIX.len()..name.len() - REPORT_SUFFIX.len()].to_string();
            let metadata = entry.metadata()?;
            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            found.push(ReportMeta {
                id,
                name,
                size_bytes: metadata.len(),
                modified,
            });
        }
        Ok(found)
    }

    fn load_latest(dir: &Path) -> Option<DriftReport> {
        let path = dir.join(LATEST_NAME);
        if !path.exists() {
            return None;
        }
        match fs::read(&path).map_err(MonitorError::from).and_then(|bytes| {
            serde_json::from_slice(&bytes)
                .map_err(|e| MonitorError::Internal(format!("unreadable latest report: {}", e)))
        }) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable latest report");
                None
            }
        }
    }

    /// Write a file atomically: temp file in the same directory, then rename.
    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let tmp = self.dir.join(format!(".{}.tmp", name));
        let dest = self.dir.join(name);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &dest)?;
        Ok(())
    }

    /// Durably persist a report and update the latest pointer.
    ///
    /// The latest pointer (on disk and in memory) changes only after the
    /// timestamped file is fully written; any failure along the way leaves
    /// the previous pointer untouched.
    pub fn append(&self, report: &DriftReport) -> Result<ReportMeta> {
        let bytes = serde_json::to_vec_pretty(report)
            .map_err(|e| MonitorError::Internal(format!("failed to serialize report: {}", e)))?;

        let name = format!("{}{}{}", REPORT_PREFIX, report.id, REPORT_SUFFIX);
        self.write_atomic(&name, &bytes)?;
        self.write_atomic(LATEST_NAME, &bytes)?;

        let meta = ReportMeta {
            id: report.id.clone(),
            name,
            size_bytes: bytes.len() as u64,
            modified: report.generated_at,
        };

        self.index.write().push(meta.clone());
        *self.latest.write() = Some(report.clone());

        Ok(meta)
    }

    /// Most recently successfully completed report, if any.
    pub fn latest(&self) -> Option<DriftReport> {
        self.latest.read().clone()
    }

    /// The `n` most recently appended reports, newest first.
    pub fn list_recent(&self, n: usize) -> Vec<ReportMeta> {
        let index = self.index.read();
        index.iter().rev().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
