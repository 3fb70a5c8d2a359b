//! Enriched assets: the merged, provenance-tracked view of one asset.

use super::key::CorrelationKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// The accepted value of one tracked attribute and who asserted it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldProvenance {
    /// Current value.
    pub value: String,
    /// Source system that provided the value.
    pub source_system: String,
    /// Specific instance of the source system, if known.
    pub source_instance: Option<String>,
    /// When the source last updated the value.
    pub timestamp: Option<DateTime<Utc>>,
    /// Trust in this assertion (0.0 - 1.0).
    pub confidence: f64,
}

impl FieldProvenance {
    /// Creates a provenance entry; confidence is clamped into [0, 1].
    pub fn new(value: String, source_system: String, confidence: f64) -> Self {
        Self {
            value,
            source_system,
            source_instance: None,
            timestamp: None,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn with_instance(mut self, source_instance: Option<String>) -> Self {
        self.source_instance = source_instance;
        self
    }

    pub fn with_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// The fixed set of attributes an enriched asset tracks with provenance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrackedField {
    Hostname,
    IpAddress,
    MacAddress,
    SerialNumber,
    AgentId,
    OperatingSystem,
    OsVersion,
    AssetType,
    OwnerEmail,
    OwnerName,
    Department,
    Location,
    AgentStatus,
    PolicyStatus,
    IsolationStatus,
}

impl TrackedField {
    /// Every tracked field, in export column order.
    pub const ALL: [TrackedField; 15] = [
        TrackedField::Hostname,
        TrackedField::IpAddress,
        TrackedField::MacAddress,
        TrackedField::SerialNumber,
        TrackedField::AgentId,
        TrackedField::OperatingSystem,
        TrackedField::OsVersion,
        TrackedField::AssetType,
        TrackedField::OwnerEmail,
        TrackedField::OwnerName,
        TrackedField::Department,
        TrackedField::Location,
        TrackedField::AgentStatus,
        TrackedField::PolicyStatus,
        TrackedField::IsolationStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedField::Hostname => "hostname",
            TrackedField::IpAddress => "ip_address",
            TrackedField::MacAddress => "mac_address",
            TrackedField::SerialNumber => "serial_number",
            TrackedField::AgentId => "agent_id",
            TrackedField::OperatingSystem => "operating_system",
            TrackedField::OsVersion => "os_version",
            TrackedField::AssetType => "asset_type",
            TrackedField::OwnerEmail => "owner_email",
            TrackedField::OwnerName => "owner_name",
            TrackedField::Department => "department",
            TrackedField::Location => "location",
            TrackedField::AgentStatus => "agent_status",
            TrackedField::PolicyStatus => "policy_status",
            TrackedField::IsolationStatus => "isolation_status",
        }
    }
}

impl std::fmt::Display for TrackedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An incoming value for a tracked field, with the trust it carries.
#[derive(Debug, Clone, Copy)]
pub struct FieldUpdate<'a> {
    pub source_system: &'a str,
    pub source_instance: Option<&'a str>,
    pub confidence: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A merged asset with provenance tracking on every field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedAsset {
    /// Stable identifier; survives deduplication for the kept asset.
    pub id: Uuid,
    /// Union of all identifiers reported for this asset.
    pub correlation_key: CorrelationKey,

    pub hostname: Option<FieldProvenance>,
    pub ip_address: Option<FieldProvenance>,
    pub mac_address: Option<FieldProvenance>,
    pub serial_number: Option<FieldProvenance>,
    pub agent_id: Option<FieldProvenance>,

    pub operating_system: Option<FieldProvenance>,
    pub os_version: Option<FieldProvenance>,
    pub asset_type: Option<FieldProvenance>,
    pub owner_email: Option<FieldProvenance>,
    pub owner_name: Option<FieldProvenance>,
    pub department: Option<FieldProvenance>,
    pub location: Option<FieldProvenance>,

    // Security posture, reported by endpoint agents.
    pub agent_status: Option<FieldProvenance>,
    pub policy_status: Option<FieldProvenance>,
    pub isolation_status: Option<FieldProvenance>,

    /// Every source that has reported this asset. Only ever grows.
    pub present_in_sources: BTreeSet<String>,

    /// Total vulnerabilities attached to this asset.
    pub vulnerability_count: u64,
    pub critical_vuln_count: u64,
    pub high_vuln_count: u64,

    /// Raw records contributed by each source, for full-fidelity export.
    pub source_records: BTreeMap<String, Vec<serde_json::Value>>,

    /// Timestamp when the asset was first created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last mutation.
    pub updated_at: DateTime<Utc>,
}

impl Default for EnrichedAsset {
    fn default() -> Self {
        Self::new(CorrelationKey::new())
    }
}

impl EnrichedAsset {
    /// Creates an empty enriched asset seeded with `key`.
    pub fn new(correlation_key: CorrelationKey) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            correlation_key,
            hostname: None,
            ip_address: None,
            mac_address: None,
            serial_number: None,
            agent_id: None,
            operating_system: None,
            os_version: None,
            asset_type: None,
            owner_email: None,
            owner_name: None,
            department: None,
            location: None,
            agent_status: None,
            policy_status: None,
            isolation_status: None,
            present_in_sources: BTreeSet::new(),
            vulnerability_count: 0,
            critical_vuln_count: 0,
            high_vuln_count: 0,
            source_records: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the provenance slot for a tracked field.
    pub fn field(&self, field: TrackedField) -> Option<&FieldProvenance> {
        self.slot(field).as_ref()
    }

    fn slot(&self, field: TrackedField) -> &Option<FieldProvenance> {
        match field {
            TrackedField::Hostname => &self.hostname,
            TrackedField::IpAddress => &self.ip_address,
            TrackedField::MacAddress => &self.mac_address,
            TrackedField::SerialNumber => &self.serial_number,
            TrackedField::AgentId => &self.agent_id,
            TrackedField::OperatingSystem => &self.operating_system,
            TrackedField::OsVersion => &self.os_version,
            TrackedField::AssetType => &self.asset_type,
            TrackedField::OwnerEmail => &self.owner_email,
            TrackedField::OwnerName => &self.owner_name,
            TrackedField::Department => &self.department,
            TrackedField::Location => &self.location,
            TrackedField::AgentStatus => &self.agent_status,
            TrackedField::PolicyStatus => &self.policy_status,
            TrackedField::IsolationStatus => &self.isolation_status,
        }
    }

    fn slot_mut(&mut self, field: TrackedField) -> &mut Option<FieldProvenance> {
        match field {
            TrackedField::Hostname => &mut self.hostname,
            TrackedField::IpAddress => &mut self.ip_address,
            TrackedField::MacAddress => &mut self.mac_address,
            TrackedField::SerialNumber => &mut self.serial_number,
            TrackedField::AgentId => &mut self.agent_id,
            TrackedField::OperatingSystem => &mut self.operating_system,
            TrackedField::OsVersion => &mut self.os_version,
            TrackedField::AssetType => &mut self.asset_type,
            TrackedField::OwnerEmail => &mut self.owner_email,
            TrackedField::OwnerName => &mut self.owner_name,
            TrackedField::Department => &mut self.department,
            TrackedField::Location => &mut self.location,
            TrackedField::AgentStatus => &mut self.agent_status,
            TrackedField::PolicyStatus => &mut self.policy_status,
            TrackedField::IsolationStatus => &mut self.isolation_status,
        }
    }

    /// Offers a value for `field`; it is stored only if the field is empty or
    /// the new confidence is strictly higher. Returns true if stored.
    ///
    /// Ties keep the existing provenance, so the first source to reach the
    /// highest confidence wins.
    pub fn set_field(
        &mut self,
        field: TrackedField,
        value: Option<&str>,
        update: FieldUpdate<'_>,
    ) -> bool {
        let Some(value) = value else {
            return false;
        };

        let slot = self.slot_mut(field);
        let replace = match slot {
            None => true,
            Some(current) => update.confidence > current.confidence,
        };
        if !replace {
            return false;
        }

        *slot = Some(
            FieldProvenance::new(
                value.to_string(),
                update.source_system.to_string(),
                update.confidence,
            )
            .with_instance(update.source_instance.map(str::to_string))
            .with_timestamp(update.timestamp),
        );
        self.updated_at = Utc::now();
        true
    }

    /// Records that `source` reported this asset.
    pub fn mark_present(&mut self, source: &str) {
        if !self.present_in_sources.contains(source) {
            self.present_in_sources.insert(source.to_string());
            self.updated_at = Utc::now();
        }
    }

    /// Appends a raw record under its source.
    pub fn push_source_record(&mut self, source: &str, record: serde_json::Value) {
        self.source_records
            .entry(source.to_string())
            .or_default()
            .push(record);
    }

    /// Returns whether `source` has reported this asset.
    pub fn is_present_in(&self, source: &str) -> bool {
        self.present_in_sources.contains(source)
    }

    /// Sources from `known_sources` that have never reported this asset.
    pub fn absent_from<'a, I>(&self, known_sources: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        known_sources
            .into_iter()
            .filter(|s| !self.present_in_sources.contains(*s))
            .map(str::to_string)
            .collect()
    }

    /// Merges `other` into this asset.
    ///
    /// Keys and sources are unioned, each tracked field keeps the provenance
    /// with higher confidence (ties keep ours), vulnerability counters are
    /// summed and raw records are concatenated per source.
    pub fn absorb(&mut self, mut other: EnrichedAsset) {
        self.correlation_key.merge(&other.correlation_key);
        self.present_in_sources
            .extend(std::mem::take(&mut other.present_in_sources));

        for field in TrackedField::ALL {
            let Some(incoming) = other.slot_mut(field).take() else {
                continue;
            };
            let slot = self.slot_mut(field);
            let replace = match slot {
                None => true,
                Some(current) => incoming.confidence > current.confidence,
            };
            if replace {
                *slot = Some(incoming);
            }
        }

        self.vulnerability_count += other.vulnerability_count;
        self.critical_vuln_count += other.critical_vuln_count;
        self.high_vuln_count += other.high_vuln_count;

        for (source, records) in other.source_records {
            self.source_records.entry(source).or_default().extend(records);
        }

        self.created_at = self.created_at.min(other.created_at);
        self.updated_at = Utc::now();
    }
}
