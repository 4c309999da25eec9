//! Driftwatch - online inference with automatic drift monitoring
//!
//! An inference service that continuously watches its own input
//! distribution for statistical drift against a fixed reference baseline
//! and periodically materializes drift reports without blocking request
//! serving.
//!
//! # Modules
//!
//! ## Monitoring Core
//! - [`buffer`] - Bounded FIFO window of recent inference inputs
//! - [`baseline`] - Immutable reference distribution snapshot
//! - [`drift`] - Pure drift analysis (KS + PSI per feature)
//! - [`reports`] - Durable report log with a latest pointer
//! - [`scheduler`] - Periodic and on-demand analysis with an
//!   at-most-one-concurrent gate
//!
//! ## Serving
//! - [`inference`] - Serving classifier and latency metrics
//! - [`monitoring`] - Rolling serving-path statistics
//!
//! ## Services
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Configuration
pub mod config;

// Monitoring core
pub mod baseline;
pub mod buffer;
pub mod drift;
pub mod reports;
pub mod scheduler;

// Serving
pub mod inference;
pub mod monitoring;

// Services
pub mod cli;
pub mod server;

pub use error::{MonitorError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{MonitorError, Result};

    // Configuration
    pub use crate::config::MonitorConfig;

    // Monitoring core
    pub use crate::baseline::ReferenceBaseline;
    pub use crate::buffer::{FeatureRecord, ProductionBuffer};
    pub use crate::drift::{DriftAnalysis, DriftAnalyzer, DriftReport};
    pub use crate::reports::{ReportMeta, ReportStore};
    pub use crate::scheduler::{DriftScheduler, SchedulerState, Trigger};

    // Serving
    pub use crate::inference::{InferenceEngine, Prediction};
    pub use crate::monitoring::{ServingMetrics, ServingStats};
}
