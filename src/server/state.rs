//! Application state management

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::baseline::ReferenceBaseline;
use crate::buffer::ProductionBuffer;
use crate::error::Result;
use crate::inference::InferenceEngine;
use crate::reports::ReportStore;
use crate::scheduler::DriftScheduler;

use super::ServerConfig;

/// Application state shared across handlers.
///
/// The buffer is owned here and injected into both the serving path and the
/// scheduler; it is constructed once per process, never ambient global
/// state.
pub struct AppState {
    pub config: ServerConfig,
    pub buffer: Arc<ProductionBuffer>,
    pub baseline: Arc<ReferenceBaseline>,
    pub engine: InferenceEngine,
    pub store: Arc<ReportStore>,
    pub scheduler: Arc<DriftScheduler>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self> {
        let baseline = Arc::new(ReferenceBaseline::iris());
        let engine = InferenceEngine::from_baseline(&baseline)?;
        let buffer = Arc::new(ProductionBuffer::new(config.monitor.buffer_capacity));
        let store = Arc::new(ReportStore::open(&config.monitor.reports_dir)?);
        let scheduler = Arc::new(DriftScheduler::new(
            &config.monitor,
            Arc::clone(&buffer),
            Arc::clone(&baseline),
            Arc::clone(&store),
        ));

        Ok(Self {
            config,
            buffer,
            baseline,
            engine,
            store,
            scheduler,
            started_at: Utc::now(),
        })
    }
}
