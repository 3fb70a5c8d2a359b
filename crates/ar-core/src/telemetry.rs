//! Metric names emitted by the correlation engine.
//!
//! Counters are recorded through the `metrics` facade; without an installed
//! recorder they are no-ops. `ar-observability` registers descriptions.

/// Records accepted by an ingest operation, labelled by `kind` and `source`.
pub const RECORDS_INGESTED_TOTAL: &str = "ar_records_ingested_total";
/// Enriched assets created because a record matched nothing.
pub const ASSETS_CREATED_TOTAL: &str = "ar_assets_created_total";
/// Owner mappings dropped because their IP matched no asset.
pub const OWNER_MAPPINGS_UNMATCHED_TOTAL: &str = "ar_owner_mappings_unmatched_total";
/// Asset pairs merged by deduplication.
pub const DEDUP_MERGES_TOTAL: &str = "ar_dedup_merges_total";
/// Current number of enriched assets in the store.
pub const ENRICHED_ASSETS: &str = "ar_enriched_assets";
/// Coverage ratio of a gap report, labelled by `source_a`, `source_b`, `direction`.
pub const GAP_COVERAGE_RATIO: &str = "ar_gap_coverage_ratio";

/// Record kinds used as the `kind` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Asset,
    Endpoint,
    Vulnerability,
    OwnerMapping,
    NetworkObservation,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Asset => "asset",
            RecordKind::Endpoint => "endpoint",
            RecordKind::Vulnerability => "vulnerability",
            RecordKind::OwnerMapping => "owner_mapping",
            RecordKind::NetworkObservation => "network_observation",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn record_ingested(kind: RecordKind, source: &str) {
    metrics::counter!(
        RECORDS_INGESTED_TOTAL,
        "kind" => kind.as_str(),
        "source" => source.to_string()
    )
    .increment(1);
}

pub(crate) fn record_asset_created() {
    metrics::counter!(ASSETS_CREATED_TOTAL).increment(1);
}

pub(crate) fn record_owner_mapping_unmatched() {
    metrics::counter!(OWNER_MAPPINGS_UNMATCHED_TOTAL).increment(1);
}

pub(crate) fn record_dedup(merges: usize, remaining: usize) {
    metrics::counter!(DEDUP_MERGES_TOTAL).increment(merges as u64);
    metrics::gauge!(ENRICHED_ASSETS).set(remaining as f64);
}

pub(crate) fn record_store_size(assets: usize) {
    metrics::gauge!(ENRICHED_ASSETS).set(assets as f64);
}
