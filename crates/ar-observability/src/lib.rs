//! # ar-observability
//!
//! Logging and metrics infrastructure for Asset Reconciler.
//!
//! Structured logging with tracing, descriptions for the engine's metrics,
//! and coverage KPIs collected from enrichment runs.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
pub use metrics::{
    record_gap_report, register_metrics, CoverageKpis, EnrichmentKpis, MetricsCollector,
};
