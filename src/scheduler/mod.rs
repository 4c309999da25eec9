//! Drift scheduler
//!
//! Drives periodic analysis runs and the manual trigger through a single
//! at-most-one-concurrent gate. Scheduled and manual requests funnel
//! through the same atomically checked-and-set Running flag; a request that
//! finds a run in flight is rejected immediately, never queued. Every exit
//! path (success, insufficient data, schema mismatch, storage failure)
//! returns the gate to Idle, and a failed cycle never stops the timer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::baseline::ReferenceBaseline;
use crate::buffer::ProductionBuffer;
use crate::config::MonitorConfig;
use crate::drift::{DriftAnalyzer, DriftReport};
use crate::error::{MonitorError, Result};
use crate::reports::ReportStore;

/// Observable scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
}

/// What requested a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduled,
    Manual,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Scheduled => "scheduled",
            Trigger::Manual => "manual",
        }
    }
}

/// RAII holder of the Running flag.
///
/// Acquisition is a compare-and-swap, so two concurrent requests can never
/// both enter; dropping the guard returns the scheduler to Idle on every
/// exit path, including panics inside a run.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

struct SchedulerInner {
    running: AtomicBool,
    interval: Duration,
    min_samples: usize,
    buffer: Arc<ProductionBuffer>,
    baseline: Arc<ReferenceBaseline>,
    analyzer: DriftAnalyzer,
    store: Arc<ReportStore>,
}

/// Periodic and on-demand drift analysis driver.
pub struct DriftScheduler {
    inner: Arc<SchedulerInner>,
    task: Mutex<Option<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

impl DriftScheduler {
    pub fn new(
        config: &MonitorConfig,
        buffer: Arc<ProductionBuffer>,
        baseline: Arc<ReferenceBaseline>,
        store: Arc<ReportStore>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(SchedulerInner {
                running: AtomicBool::new(false),
                interval: Duration::from_secs(config.interval_secs),
                min_samples: config.min_samples,
                buffer,
                baseline,
                analyzer: DriftAnalyzer::new(),
                store,
            }),
            task: Mutex::new(None),
            shutdown,
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.inner.running.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn min_samples(&self) -> usize {
        self.inner.min_samples
    }

    /// Execute one analysis cycle if the scheduler is idle.
    ///
    /// Returns the persisted report on success. Expected non-fatal outcomes
    /// come back as errors the caller surfaces as structured status:
    /// [`MonitorError::AlreadyRunning`] when a run is in flight and
    /// [`MonitorError::InsufficientData`] when the buffer is below the
    /// minimum-samples gate.
    pub async fn run_once(&self, trigger: Trigger) -> Result<DriftReport> {
        let Some(_guard) = RunGuard::acquire(&self.inner.running) else {
            debug!(trigger = trigger.as_str(), "analysis already in progress, rejecting");
            return Err(MonitorError::AlreadyRunning);
        };

        let window = self.inner.buffer.snapshot();
        if window.len() < self.inner.min_samples {
            info!(
                trigger = trigger.as_str(),
                have = window.len(),
                need = self.inner.min_samples,
                "not enough data for analysis, skipping this cycle"
            );
            return Err(MonitorError::InsufficientData {
                have: window.len(),
                need: self.inner.min_samples,
            });
        }

        info!(
            trigger = trigger.as_str(),
            window_size = window.len(),
            "drift analysis started"
        );
        let started = Instant::now();

        // Analysis can take far longer than a request; run it off the async
        // executor and outside every lock the serving path can touch.
        let analyzer = self.inner.analyzer.clone();
        let baseline = Arc::clone(&self.inner.baseline);
        let analysis =
            tokio::task::spawn_blocking(move || analyzer.analyze(&baseline, &window))
                .await
                .map_err(|e| MonitorError::Internal(format!("analysis task failed: {}", e)))?
                .inspect_err(|e| {
                    error!(trigger = trigger.as_str(), error = %e, "drift analysis failed");
                })?;

        let report = DriftReport::new(analysis);
        let meta = self.inner.store.append(&report).inspect_err(|e| {
            error!(
                trigger = trigger.as_str(),
                report_id = %report.id,
                error = %e,
                "failed to persist drift report, latest pointer unchanged"
            );
        })?;

        let elapsed = started.elapsed();
        if elapsed > self.inner.interval {
            warn!(
                elapsed_secs = elapsed.as_secs_f64(),
                interval_secs = self.inner.interval.as_secs_f64(),
                "analysis run took longer than the tick interval"
            );
        }

        info!(
            trigger = trigger.as_str(),
            report_id = %report.id,
            file = %meta.name,
            verdict = report.analysis.verdict(),
            n_drifted = report.analysis.n_drifted,
            elapsed_ms = elapsed.as_millis() as u64,
            "drift report generated"
        );

        Ok(report)
    }

    /// Start the periodic tick task. The first run fires one interval after
    /// start. Idempotent: starting an already-started scheduler is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock();
        if task.is_some() {
            warn!("scheduler already started");
            return;
        }

        let scheduler = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.inner.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() fires immediately; consume the first tick so runs
            // start one full interval after startup.
            ticker.tick().await;

            info!(
                interval_secs = scheduler.inner.interval.as_secs(),
                "drift scheduler started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Every outcome is logged inside run_once; a bad
                        // cycle never stops future cycles.
                        let _ = scheduler.run_once(Trigger::Scheduled).await;
                    }
                    _ = shutdown.changed() => {
                        info!("drift scheduler stopping");
                        break;
                    }
                }
            }
        }));
    }

    /// Stop the periodic task. Pending ticks are cancelled; an in-flight
    /// run finishes on its own before the task exits.
    pub async fn stop(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = self.shutdown.send(true);
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::buffer::FeatureRecord;

    fn setup(min_samples: usize, reports_dir: &std::path::Path) -> DriftScheduler {
        let config = MonitorConfig {
            buffer_capacity: 500,
            interval_secs: 300,
            min_samples,
            reports_dir: reports_dir.to_path_buf(),
        };
        let buffer = Arc::new(ProductionBuffer::new(config.buffer_capacity));
        let baseline = Arc::new(ReferenceBaseline::iris());
        let store = Arc::new(ReportStore::open(&config.reports_dir).unwrap());
        DriftScheduler::new(&config, buffer, baseline, store)
    }

    fn fill_from_baseline(scheduler: &DriftScheduler, n: usize) {
        // Evenly strided baseline rows, so the window matches the reference
        // distribution and successful runs report no drift.
        let baseline = &scheduler.inner.baseline;
        for i in 0..n {
            let row = (i * 5) % baseline.len();
            let mut values = BTreeMap::new();
            for (idx, name) in baseline.feature_names().iter().enumerate() {
                values.insert(name.clone(), baseline.data()[[row, idx]]);
            }
            scheduler
                .inner
                .buffer
                .append(FeatureRecord::new(values).with_prediction(0));
        }
    }

    #[tokio::test]
    async fn test_insufficient_data_skips_cycle() {
        let tmp = tempfile::tempdir().unwrap();
        let scheduler = setup(10, tmp.path());
        fill_from_baseline(&scheduler, 3);

        let err = scheduler.run_once(Trigger::Manual).await.unwrap_err();
        assert!(matches!(
            err,
            MonitorError::InsufficientData { have: 3, need: 10 }
        ));
        assert!(scheduler.inner.store.latest().is_none());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_successful_run_updates_latest() {
        let tmp = tempfile::tempdir().unwrap();
        let scheduler = setup(10, tmp.path());
        fill_from_baseline(&scheduler, 30);

        let report = scheduler.run_once(Trigger::Manual).await.unwrap();
        assert!(!report.analysis.drift_detected);
        assert_eq!(
            scheduler.inner.store.latest().unwrap().id,
            report.id
        );
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_busy_scheduler_rejects_trigger() {
        let tmp = tempfile::tempdir().unwrap();
        let scheduler = setup(10, tmp.path());
        fill_from_baseline(&scheduler, 20);

        scheduler.inner.running.store(true, Ordering::Release);
        assert_eq!(scheduler.state(), SchedulerState::Running);

        let err = scheduler.run_once(Trigger::Manual).await.unwrap_err();
        assert!(matches!(err, MonitorError::AlreadyRunning));

        scheduler.inner.running.store(false, Ordering::Release);
        assert!(scheduler.run_once(Trigger::Manual).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_triggers_one_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let scheduler = Arc::new(setup(10, tmp.path()));
        fill_from_baseline(&scheduler, 500);

        // Polled concurrently on one task: the first future takes the gate
        // before its first await point, so the second is rejected.
        let (a, b) = tokio::join!(
            scheduler.run_once(Trigger::Manual),
            scheduler.run_once(Trigger::Manual)
        );

        let outcomes = [a, b];
        let completed = outcomes.iter().filter(|r| r.is_ok()).count();
        let rejected = outcomes
            .iter()
            .filter(|r| matches!(r, Err(MonitorError::AlreadyRunning)))
            .count();

        assert_eq!(completed, 1);
        assert_eq!(rejected, 1);
        assert_eq!(scheduler.inner.store.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_latest_and_returns_to_idle() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("reports");
        let scheduler = setup(10, &dir);
        fill_from_baseline(&scheduler, 20);

        let first = scheduler.run_once(Trigger::Manual).await.unwrap();

        // Break the reports directory so the next persist fails.
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, b"not a directory").unwrap();

        let err = scheduler.run_once(Trigger::Scheduled).await.unwrap_err();
        assert!(matches!(err, MonitorError::Storage(_)));
        assert_eq!(scheduler.inner.store.latest().unwrap().id, first.id);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_schema_mismatch_returns_to_idle() {
        let tmp = tempfile::tempdir().unwrap();
        let scheduler = setup(2, tmp.path());

        // Records missing every compared feature.
        for i in 0..3 {
            let mut values = BTreeMap::new();
            values.insert("bogus".to_string(), i as f64);
            scheduler.inner.buffer.append(FeatureRecord::new(values));
        }

        let err = scheduler.run_once(Trigger::Manual).await.unwrap_err();
        assert!(matches!(err, MonitorError::SchemaMismatch { .. }));
        assert!(scheduler.inner.store.latest().is_none());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let tmp = tempfile::tempdir().unwrap();
        let scheduler = Arc::new(setup(10, tmp.path()));

        scheduler.start();
        // Starting twice is a no-op.
        scheduler.start();

        scheduler.stop().await;
        assert!(scheduler.task.lock().is_none());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }
}
