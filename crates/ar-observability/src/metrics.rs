//! Metrics for the correlation engine.
//!
//! `ar-core` emits its counters through the `metrics` facade; this module
//! describes them, publishes gap-report coverage as gauges and keeps the
//! latest coverage KPIs per source pair for export.

use ar_core::telemetry::{
    ASSETS_CREATED_TOTAL, DEDUP_MERGES_TOTAL, ENRICHED_ASSETS, GAP_COVERAGE_RATIO,
    OWNER_MAPPINGS_UNMATCHED_TOTAL, RECORDS_INGESTED_TOTAL,
};
use ar_core::{EnrichmentSummary, GapReport};
use chrono::{DateTime, Utc};
use metrics::{describe_counter, describe_gauge, gauge};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Registers descriptions for every engine metric.
pub fn register_metrics() {
    describe_counter!(
        RECORDS_INGESTED_TOTAL,
        "Total number of records ingested, by kind and source"
    );
    describe_counter!(
        ASSETS_CREATED_TOTAL,
        "Total number of enriched assets created from unmatched records"
    );
    describe_counter!(
        OWNER_MAPPINGS_UNMATCHED_TOTAL,
        "Total number of owner mappings whose IP matched no asset"
    );
    describe_counter!(
        DEDUP_MERGES_TOTAL,
        "Total number of asset pairs merged by deduplication"
    );

    describe_gauge!(ENRICHED_ASSETS, "Current number of enriched assets");
    describe_gauge!(
        GAP_COVERAGE_RATIO,
        "Share of one source's assets also seen by another"
    );
}

/// Publishes both coverage directions of a gap report.
pub fn record_gap_report(report: &GapReport) {
    gauge!(
        GAP_COVERAGE_RATIO,
        "source_a" => report.source_a.clone(),
        "source_b" => report.source_b.clone(),
        "direction" => "a_to_b"
    )
    .set(report.coverage_a_to_b());
    gauge!(
        GAP_COVERAGE_RATIO,
        "source_a" => report.source_a.clone(),
        "source_b" => report.source_b.clone(),
        "direction" => "b_to_a"
    )
    .set(report.coverage_b_to_a());
}

/// Latest coverage figures for one source pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageKpis {
    pub source_a: String,
    pub source_b: String,
    pub in_both: usize,
    pub only_in_a: usize,
    pub only_in_b: usize,
    pub coverage_a_to_b: f64,
    pub coverage_b_to_a: f64,
    pub recorded_at: DateTime<Utc>,
}

impl CoverageKpis {
    fn from_report(report: &GapReport, recorded_at: DateTime<Utc>) -> Self {
        Self {
            source_a: report.source_a.clone(),
            source_b: report.source_b.clone(),
            in_both: report.in_both.len(),
            only_in_a: report.in_a_not_b.len(),
            only_in_b: report.in_b_not_a.len(),
            coverage_a_to_b: report.coverage_a_to_b(),
            coverage_b_to_a: report.coverage_b_to_a(),
            recorded_at,
        }
    }
}

/// Aggregate figures across enrichment runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentKpis {
    /// Enrichment runs recorded.
    pub runs: u64,
    /// Dedup merges across all runs.
    pub total_merges: u64,
    /// Asset count after the most recent run.
    pub asset_count: usize,
    pub last_run_at: Option<DateTime<Utc>>,
    /// Latest figures per source pair, ordered by pair.
    pub coverage: Vec<CoverageKpis>,
}

#[derive(Debug, Default)]
struct RunTotals {
    runs: u64,
    total_merges: u64,
    asset_count: usize,
    last_run_at: Option<DateTime<Utc>>,
}

/// Collects enrichment outcomes for KPI export.
#[derive(Clone)]
pub struct MetricsCollector {
    coverage: Arc<RwLock<BTreeMap<(String, String), CoverageKpis>>>,
    totals: Arc<RwLock<RunTotals>>,
}

impl MetricsCollector {
    /// Creates a collector and registers metric descriptions.
    pub fn new() -> Self {
        register_metrics();

        Self {
            coverage: Arc::new(RwLock::new(BTreeMap::new())),
            totals: Arc::new(RwLock::new(RunTotals::default())),
        }
    }

    /// Records one enrichment run and publishes its coverage gauges.
    pub async fn record_enrichment(&self, summary: &EnrichmentSummary) {
        let now = Utc::now();

        let mut coverage = self.coverage.write().await;
        for report in &summary.gap_reports {
            record_gap_report(report);
            coverage.insert(
                (report.source_a.clone(), report.source_b.clone()),
                CoverageKpis::from_report(report, now),
            );
        }

        let mut totals = self.totals.write().await;
        totals.runs += 1;
        totals.total_merges += summary.merges as u64;
        totals.asset_count = summary.asset_count;
        totals.last_run_at = Some(now);
    }

    /// Latest coverage for one ordered source pair.
    pub async fn coverage_for(&self, source_a: &str, source_b: &str) -> Option<CoverageKpis> {
        self.coverage
            .read()
            .await
            .get(&(source_a.to_string(), source_b.to_string()))
            .cloned()
    }

    /// Calculates current KPIs.
    pub async fn calculate_kpis(&self) -> EnrichmentKpis {
        let coverage = self.coverage.read().await;
        let totals = self.totals.read().await;

        EnrichmentKpis {
            runs: totals.runs,
            total_merges: totals.total_merges,
            asset_count: totals.asset_count,
            last_run_at: totals.last_run_at,
            coverage: coverage.values().cloned().collect(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
