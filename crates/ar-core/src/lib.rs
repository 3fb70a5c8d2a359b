//! # ar-core
//!
//! Asset correlation engine for Asset Reconciler.
//!
//! Records describing the same physical or virtual machine arrive from
//! vulnerability scanners, EDR agents, CMDBs, IPAM, directories and network
//! sensors, each with a partial and inconsistently formatted set of
//! identifiers. This crate normalizes those identifiers into a correlation
//! key, matches records against what is already known, merges attributes with
//! per-field provenance, deduplicates assets whose keys come to overlap, and
//! reports coverage gaps between sources.

pub mod config;
pub mod correlator;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod scoring;
pub mod telemetry;

pub use config::{ConfigError, ConfigResult, EngineConfig, EnrichmentConfig, NormalizationConfig};
pub use correlator::{AssetCorrelator, MatchIndex};
pub use models::{
    AssetRecord, CorrelationKey, EndpointRecord, EnrichedAsset, FieldProvenance, GapReport,
    GapSummary, IdentifierType, KeyBuilder, MatchResult, NetworkObservationRecord,
    OwnerMappingRecord, Severity, SourceRecord, TrackedField, VulnerabilityRecord,
};
pub use pipeline::{
    drain_feed, run_enrichment, EnrichmentSummary, IngestBatch, IngestHandle, PipelineError,
    PipelineResult, RecordFeed, SharedCorrelator, StaticFeed,
};
pub use scoring::{MatchWeights, SourceConfidence};
