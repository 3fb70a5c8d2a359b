//! Asset correlator: merges records from multiple sources into enriched assets.
//!
//! The correlator keeps in-memory indexes on agent IDs, serial numbers, MACs,
//! hostnames and IPs. Each ingested record is normalized into a correlation
//! key and matched against those indexes. A match merges the record into the
//! existing enriched asset with provenance tracking; no match creates a new
//! asset.
//!
//! Matching is optimistic: a record is merged into the single best candidate
//! and never reconciles two pre-existing assets it happens to link. Call
//! [`AssetCorrelator::deduplicate`] after ingestion batches to merge assets
//! whose keys have come to overlap.
//!
//! The correlator is single-threaded and synchronous. For concurrent
//! producers wrap it in [`crate::pipeline::SharedCorrelator`].

mod dedup;
pub mod index;

pub use index::MatchIndex;

use crate::config::EngineConfig;
use crate::models::{
    AssetRecord, CorrelationKey, EndpointRecord, EnrichedAsset, FieldUpdate, GapReport,
    IdentifierType, KeyBuilder, MatchResult, NetworkObservationRecord, OwnerMappingRecord,
    Severity, SourceRecord, TrackedField, VulnerabilityRecord,
};
use crate::scoring::SourceConfidence;
use crate::telemetry::{self, RecordKind};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Correlates and enriches assets from multiple security sources.
#[derive(Debug, Clone, Default)]
pub struct AssetCorrelator {
    assets: Vec<EnrichedAsset>,
    index: MatchIndex,
    source_confidence: SourceConfidence,
    keep_internal_suffixes: bool,
}

/// Where an ingested record landed.
struct Resolution {
    position: usize,
    created: bool,
}

impl AssetCorrelator {
    /// Creates an empty correlator with the built-in confidence tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty correlator honouring normalization and
    /// source-confidence settings from `config`.
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            assets: Vec::new(),
            index: MatchIndex::new(),
            source_confidence: SourceConfidence::with_overrides(
                config
                    .source_confidence
                    .iter()
                    .map(|(name, score)| (name.as_str(), *score)),
            ),
            keep_internal_suffixes: !config.normalization.strip_internal_suffixes,
        }
    }

    /// Number of unique enriched assets.
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// The source trust table in use.
    pub fn source_confidence(&self) -> &SourceConfidence {
        &self.source_confidence
    }

    fn key_builder(&self) -> KeyBuilder {
        KeyBuilder::new(!self.keep_internal_suffixes)
    }

    /// Finds the matching asset for `key`, creating one seeded with `key`
    /// when nothing matches.
    fn resolve(&mut self, key: &CorrelationKey, kind: RecordKind) -> Resolution {
        let result = self.index.find_match(key);
        match result.asset_index {
            Some(position) if result.matched => {
                debug!(
                    kind = %kind,
                    position,
                    confidence = result.confidence,
                    matched_on = ?result.matched_on,
                    "Record matched existing asset"
                );
                Resolution {
                    position,
                    created: false,
                }
            }
            _ => {
                self.assets.push(EnrichedAsset::new(key.clone()));
                telemetry::record_asset_created();
                let position = self.assets.len() - 1;
                debug!(kind = %kind, position, identifiers = key.len(), "Created enriched asset");
                Resolution {
                    position,
                    created: true,
                }
            }
        }
    }

    /// Merges the key, source presence and raw record into the asset at
    /// `position`, then indexes the key against that position.
    fn attach<R: SourceRecord>(&mut self, position: usize, key: &CorrelationKey, record: &R) {
        let source = record.source_name();
        let asset = &mut self.assets[position];
        asset.correlation_key.merge(key);
        asset.mark_present(source);
        asset.push_source_record(source, record.to_raw());
        self.index.register(position, key);
    }

    fn apply_fields(
        &mut self,
        position: usize,
        fields: &[(TrackedField, Option<&str>)],
        update: FieldUpdate<'_>,
    ) {
        let asset = &mut self.assets[position];
        for (field, value) in fields {
            asset.set_field(*field, *value, update);
        }
    }

    // -- Ingestion ---------------------------------------------------------

    /// Ingests assets from scanners, CMDB, IPAM or cloud inventories.
    ///
    /// Returns the number of records ingested.
    #[instrument(skip_all)]
    pub fn ingest_assets<I>(&mut self, assets: I) -> usize
    where
        I: IntoIterator<Item = AssetRecord>,
    {
        let mut count = 0;
        let mut created = 0;
        for asset in assets {
            let source = asset.source_name().to_string();
            let key = self
                .key_builder()
                .hostname(asset.hostname.as_deref())
                .ip_address(asset.ip_address.as_deref())
                .mac_address(asset.mac_address.as_deref())
                .serial_number(asset.serial_number.as_deref())
                .build();

            let resolution = self.resolve(&key, RecordKind::Asset);
            created += usize::from(resolution.created);
            self.attach(resolution.position, &key, &asset);

            let update = FieldUpdate {
                source_system: &source,
                source_instance: asset.source_instance.as_deref(),
                confidence: self.source_confidence.get(&source),
                timestamp: asset.source_updated_at,
            };
            self.apply_fields(
                resolution.position,
                &[
                    (TrackedField::Hostname, asset.hostname.as_deref()),
                    (TrackedField::IpAddress, asset.ip_address.as_deref()),
                    (TrackedField::MacAddress, asset.mac_address.as_deref()),
                    (TrackedField::SerialNumber, asset.serial_number.as_deref()),
                    (TrackedField::OperatingSystem, asset.operating_system.as_deref()),
                    (TrackedField::OsVersion, asset.os_version.as_deref()),
                    (TrackedField::AssetType, asset.asset_type.as_deref()),
                    (TrackedField::OwnerEmail, asset.owner_email.as_deref()),
                    (TrackedField::OwnerName, asset.owner_name.as_deref()),
                    (TrackedField::Department, asset.department.as_deref()),
                    (TrackedField::Location, asset.location.as_deref()),
                ],
                update,
            );

            telemetry::record_ingested(RecordKind::Asset, &source);
            count += 1;
        }

        self.finish_batch(RecordKind::Asset, count, created);
        count
    }

    /// Ingests endpoints from EDR, AV, XDR or MDM platforms.
    ///
    /// Returns the number of records ingested.
    #[instrument(skip_all)]
    pub fn ingest_endpoints<I>(&mut self, endpoints: I) -> usize
    where
        I: IntoIterator<Item = EndpointRecord>,
    {
        let mut count = 0;
        let mut created = 0;
        for ep in endpoints {
            let source = ep.source_name().to_string();
            let key = self
                .key_builder()
                .hostname(ep.hostname.as_deref())
                .ip_address(ep.ip_address.as_deref())
                .mac_address(ep.mac_address.as_deref())
                .serial_number(ep.serial_number.as_deref())
                .agent_id(ep.agent_id.as_deref())
                .build();

            let resolution = self.resolve(&key, RecordKind::Endpoint);
            created += usize::from(resolution.created);
            self.attach(resolution.position, &key, &ep);

            let update = FieldUpdate {
                source_system: &source,
                source_instance: ep.source_instance.as_deref(),
                confidence: self.source_confidence.get(&source),
                timestamp: ep.source_updated_at,
            };
            self.apply_fields(
                resolution.position,
                &[
                    (TrackedField::Hostname, ep.hostname.as_deref()),
                    (TrackedField::IpAddress, ep.ip_address.as_deref()),
                    (TrackedField::MacAddress, ep.mac_address.as_deref()),
                    (TrackedField::SerialNumber, ep.serial_number.as_deref()),
                    (TrackedField::AgentId, ep.agent_id.as_deref()),
                    (TrackedField::OperatingSystem, ep.operating_system.as_deref()),
                    (TrackedField::OsVersion, ep.os_version.as_deref()),
                    (TrackedField::AssetType, ep.endpoint_type.as_deref()),
                    (TrackedField::OwnerEmail, ep.owner_email.as_deref()),
                    (TrackedField::OwnerName, ep.owner_name.as_deref()),
                    (TrackedField::Department, ep.department.as_deref()),
                    (TrackedField::AgentStatus, ep.agent_status.as_deref()),
                    (TrackedField::PolicyStatus, ep.policy_status.as_deref()),
                    (TrackedField::IsolationStatus, ep.isolation_status.as_deref()),
                ],
                update,
            );

            telemetry::record_ingested(RecordKind::Endpoint, &source);
            count += 1;
        }

        self.finish_batch(RecordKind::Endpoint, count, created);
        count
    }

    /// Attaches vulnerabilities to matching assets by hostname and IP.
    ///
    /// An unmatched finding still creates an asset to hold its counters.
    /// No tracked fields are merged. Returns the number of records ingested.
    #[instrument(skip_all)]
    pub fn ingest_vulnerabilities<I>(&mut self, vulns: I) -> usize
    where
        I: IntoIterator<Item = VulnerabilityRecord>,
    {
        let mut count = 0;
        let mut created = 0;
        for vuln in vulns {
            let source = vuln.source_name().to_string();
            let key = self
                .key_builder()
                .hostname(vuln.hostname.as_deref())
                .ip_address(vuln.ip_address.as_deref())
                .build();

            let resolution = self.resolve(&key, RecordKind::Vulnerability);
            if resolution.created {
                self.index.register(resolution.position, &key);
                created += 1;
            }

            let asset = &mut self.assets[resolution.position];
            asset.mark_present(&source);
            asset.vulnerability_count += 1;
            match vuln.severity_level() {
                Some(Severity::Critical) => asset.critical_vuln_count += 1,
                Some(Severity::High) => asset.high_vuln_count += 1,
                _ => {}
            }

            telemetry::record_ingested(RecordKind::Vulnerability, &source);
            count += 1;
        }

        self.finish_batch(RecordKind::Vulnerability, count, created);
        count
    }

    /// Applies owner mappings to existing assets, matched by IP only.
    ///
    /// Mappings never create assets. The effective confidence is the
    /// source's trust discounted by the mapping's own confidence. Returns
    /// the number of mappings that matched an asset.
    #[instrument(skip_all)]
    pub fn ingest_owner_mappings<I>(&mut self, mappings: I) -> usize
    where
        I: IntoIterator<Item = OwnerMappingRecord>,
    {
        let mut count = 0;
        let mut unmatched = 0;
        for mapping in mappings {
            let source = mapping.source_name().to_string();
            let key = self
                .key_builder()
                .ip_address(mapping.ip_address.as_deref())
                .build();

            let result = self.index.find_match(&key);
            let Some(position) = result.asset_index.filter(|_| result.matched) else {
                debug!(
                    source = %source,
                    ip_address = ?mapping.ip_address,
                    "Owner mapping matched no asset"
                );
                telemetry::record_owner_mapping_unmatched();
                unmatched += 1;
                continue;
            };

            let update = FieldUpdate {
                source_system: &source,
                source_instance: mapping.source_instance.as_deref(),
                confidence: self.source_confidence.get(&source) * mapping.confidence,
                timestamp: mapping.source_updated_at,
            };
            self.apply_fields(
                position,
                &[
                    (TrackedField::OwnerEmail, mapping.owner_email.as_deref()),
                    (TrackedField::OwnerName, mapping.owner_name.as_deref()),
                    (TrackedField::Department, mapping.department.as_deref()),
                    (TrackedField::Location, mapping.location.as_deref()),
                ],
                update,
            );

            telemetry::record_ingested(RecordKind::OwnerMapping, &source);
            count += 1;
        }

        info!(applied = count, unmatched, "Applied owner mappings");
        count
    }

    /// Ingests passive observations from network detection tools.
    ///
    /// Returns the number of records ingested.
    #[instrument(skip_all)]
    pub fn ingest_network_observations<I>(&mut self, observations: I) -> usize
    where
        I: IntoIterator<Item = NetworkObservationRecord>,
    {
        let mut count = 0;
        let mut created = 0;
        for obs in observations {
            let source = obs.source_name().to_string();
            let key = self
                .key_builder()
                .hostname(obs.hostname.as_deref())
                .ip_address(obs.ip_address.as_deref())
                .mac_address(obs.mac_address.as_deref())
                .build();

            let resolution = self.resolve(&key, RecordKind::NetworkObservation);
            created += usize::from(resolution.created);
            self.attach(resolution.position, &key, &obs);

            let update = FieldUpdate {
                source_system: &source,
                source_instance: obs.source_instance.as_deref(),
                confidence: self.source_confidence.get(&source),
                timestamp: obs.source_updated_at,
            };
            self.apply_fields(
                resolution.position,
                &[
                    (TrackedField::Hostname, obs.hostname.as_deref()),
                    (TrackedField::IpAddress, obs.ip_address.as_deref()),
                    (TrackedField::MacAddress, obs.mac_address.as_deref()),
                ],
                update,
            );

            telemetry::record_ingested(RecordKind::NetworkObservation, &source);
            count += 1;
        }

        self.finish_batch(RecordKind::NetworkObservation, count, created);
        count
    }

    fn finish_batch(&self, kind: RecordKind, count: usize, created: usize) {
        telemetry::record_store_size(self.assets.len());
        info!(
            kind = %kind,
            ingested = count,
            created,
            total_assets = self.assets.len(),
            "Ingested batch"
        );
    }

    // -- Queries -----------------------------------------------------------

    /// Iterates all enriched assets in store order.
    pub fn get_enriched_assets(&self) -> std::slice::Iter<'_, EnrichedAsset> {
        self.assets.iter()
    }

    /// Owned copy of every enriched asset, for readers that must not hold
    /// the correlator while deduplication runs.
    pub fn snapshot(&self) -> Vec<EnrichedAsset> {
        self.assets.clone()
    }

    /// Looks up an asset by its stable ID.
    pub fn get(&self, id: Uuid) -> Option<&EnrichedAsset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Normalizes `raw` and returns the first asset indexed under it.
    pub fn find_by_identifier(
        &self,
        identifier_type: IdentifierType,
        raw: &str,
    ) -> Option<&EnrichedAsset> {
        let builder = self.key_builder();
        let key = match identifier_type {
            IdentifierType::AgentId => builder.agent_id(Some(raw)),
            IdentifierType::SerialNumber => builder.serial_number(Some(raw)),
            IdentifierType::MacAddress => builder.mac_address(Some(raw)),
            IdentifierType::Hostname => builder.hostname(Some(raw)),
            IdentifierType::IpAddress => builder.ip_address(Some(raw)),
        }
        .build();

        let value = key.values(identifier_type).iter().next()?;
        let position = *self.index.positions(identifier_type, value).first()?;
        self.assets.get(position)
    }

    /// Matches raw identifiers against the store without ingesting anything.
    pub fn probe(&self, key: &CorrelationKey) -> MatchResult {
        self.index.find_match(key)
    }

    /// Every source name that has reported at least one asset.
    pub fn sources(&self) -> BTreeSet<&str> {
        self.assets
            .iter()
            .flat_map(|a| a.present_in_sources.iter().map(String::as_str))
            .collect()
    }

    /// Computes coverage gaps between two sources.
    ///
    /// Assets reported by neither source are left out. An unknown source
    /// name simply yields empty partitions.
    pub fn gap_analysis(&self, source_a: &str, source_b: &str) -> GapReport {
        let mut report = GapReport::new(source_a, source_b);

        for asset in &self.assets {
            let in_a = asset.is_present_in(source_a);
            let in_b = asset.is_present_in(source_b);
            match (in_a, in_b) {
                (true, true) => report.in_both.push(asset.correlation_key.clone()),
                (true, false) => report.in_a_not_b.push(asset.correlation_key.clone()),
                (false, true) => report.in_b_not_a.push(asset.correlation_key.clone()),
                (false, false) => {}
            }
        }

        debug!(summary = %report.summary(), "Computed gap analysis");
        report
    }
}
