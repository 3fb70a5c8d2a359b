//! Data models for asset correlation.
//!
//! Input records produced by upstream parsers, the correlation key used to
//! match them, the enriched asset they merge into, and the reports the
//! correlator derives from the store.

pub mod enriched;
pub mod key;
pub mod records;
pub mod report;

pub use enriched::{EnrichedAsset, FieldProvenance, FieldUpdate, TrackedField};
pub use key::{CorrelationKey, IdentifierType, KeyBuilder};
pub use records::{
    AssetRecord, EndpointRecord, NetworkObservationRecord, OwnerMappingRecord, Severity,
    SourceRecord, VulnerabilityRecord, UNKNOWN_SOURCE,
};
pub use report::{GapReport, GapSummary, MatchResult};
