//! Canonical input records.
//!
//! Upstream parsers and connectors normalize vendor data into these shapes
//! before handing them to the correlator. Every identifier is still raw here;
//! the correlator normalizes them when it builds a correlation key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Source name used when a record does not say where it came from.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Normalized vulnerability severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Low severity (includes informational findings).
    Low,
    /// Medium severity.
    Medium,
    /// High severity.
    High,
    /// Critical severity.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

/// Common provenance accessors shared by every record kind.
pub trait SourceRecord: Serialize {
    /// Raw source system name as reported by the producer.
    fn source_system(&self) -> Option<&str>;

    /// When the source last updated this record, if known.
    fn source_updated_at(&self) -> Option<DateTime<Utc>>;

    /// Effective source name; blank or missing sources become `"unknown"`.
    fn source_name(&self) -> &str {
        match self.source_system() {
            Some(s) if !s.trim().is_empty() => s,
            _ => UNKNOWN_SOURCE,
        }
    }

    /// Serializes the record with absent fields omitted.
    fn to_raw(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(value) => strip_nulls(value),
            Err(_) => serde_json::Value::Null,
        }
    }
}

fn strip_nulls(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        other => other,
    }
}

macro_rules! impl_source_record {
    ($($record:ty),+ $(,)?) => {
        $(
            impl SourceRecord for $record {
                fn source_system(&self) -> Option<&str> {
                    self.source_system.as_deref()
                }

                fn source_updated_at(&self) -> Option<DateTime<Utc>> {
                    self.source_updated_at
                }
            }
        )+
    };
}

/// Asset from a scanner, CMDB, IPAM or cloud inventory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssetRecord {
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub serial_number: Option<String>,
    pub asset_tag: Option<String>,

    /// Server, Workstation, Network Device, ...
    pub asset_type: Option<String>,
    /// Production, Development, Test, ...
    pub environment: Option<String>,
    pub criticality: Option<String>,

    pub owner_email: Option<String>,
    pub owner_name: Option<String>,
    pub department: Option<String>,
    pub business_unit: Option<String>,
    pub cost_center: Option<String>,

    pub operating_system: Option<String>,
    pub os_version: Option<String>,
    pub location: Option<String>,

    pub source_system: Option<String>,
    pub source_instance: Option<String>,
    pub source_updated_at: Option<DateTime<Utc>>,
    pub record_id: Option<String>,

    /// Source fields with no place in the canonical schema.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Endpoint from an EDR, AV, XDR or MDM platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EndpointRecord {
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub serial_number: Option<String>,
    /// Agent identifier issued by the EDR/AV vendor.
    pub agent_id: Option<String>,
    /// Platform device identifier.
    pub device_id: Option<String>,

    pub agent_version: Option<String>,
    /// Online, Offline, Degraded, Uninstalled.
    pub agent_status: Option<String>,

    pub operating_system: Option<String>,
    pub os_version: Option<String>,
    /// Workstation, Server, Container, Mobile.
    pub endpoint_type: Option<String>,

    pub owner_email: Option<String>,
    pub owner_name: Option<String>,
    pub department: Option<String>,

    /// Compliant, Non-Compliant, Unknown.
    pub policy_status: Option<String>,
    /// Normal, Isolated, Pending.
    pub isolation_status: Option<String>,

    pub source_system: Option<String>,
    pub source_instance: Option<String>,
    pub source_updated_at: Option<DateTime<Utc>>,
    pub record_id: Option<String>,
}

/// Vulnerability finding from a scanner.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VulnerabilityRecord {
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    /// Normalized severity name: Critical, High, Medium or Low.
    pub severity: String,
    pub title: Option<String>,
    pub cve_id: Option<String>,
    pub cvss_score: Option<f64>,
    pub port: Option<u16>,

    pub source_system: Option<String>,
    pub source_instance: Option<String>,
    pub source_updated_at: Option<DateTime<Utc>>,
    pub record_id: Option<String>,
}

impl VulnerabilityRecord {
    /// Returns the parsed severity, if it names one of the four levels.
    pub fn severity_level(&self) -> Option<Severity> {
        match self.severity.trim().to_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }
}

fn full_confidence() -> f64 {
    1.0
}

/// Owner assignment from IPAM, CMDB or a directory export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnerMappingRecord {
    pub ip_address: Option<String>,
    pub owner_email: Option<String>,
    pub owner_name: Option<String>,
    pub department: Option<String>,
    pub business_unit: Option<String>,
    pub location: Option<String>,

    /// The mapping's self-reported reliability (0.0 - 1.0).
    #[serde(default = "full_confidence")]
    pub confidence: f64,

    pub source_system: Option<String>,
    pub source_instance: Option<String>,
    pub source_updated_at: Option<DateTime<Utc>>,
    pub record_id: Option<String>,
}

impl Default for OwnerMappingRecord {
    fn default() -> Self {
        Self {
            ip_address: None,
            owner_email: None,
            owner_name: None,
            department: None,
            business_unit: None,
            location: None,
            confidence: full_confidence(),
            source_system: None,
            source_instance: None,
            source_updated_at: None,
            record_id: None,
        }
    }
}

/// Passive observation from a network detection tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkObservationRecord {
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub vlan: Option<String>,
    /// The observer's own device classification.
    pub device_type_guess: Option<String>,

    pub source_system: Option<String>,
    pub source_instance: Option<String>,
    pub source_updated_at: Option<DateTime<Utc>>,
    pub record_id: Option<String>,
}

impl_source_record!(
    AssetRecord,
    EndpointRecord,
    VulnerabilityRecord,
    OwnerMappingRecord,
    NetworkObservationRecord,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_name_defaults_to_unknown() {
        let record = AssetRecord::default();
        assert_eq!(record.source_name(), UNKNOWN_SOURCE);

        let record = AssetRecord {
            source_system: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(record.source_name(), UNKNOWN_SOURCE);

        let record = EndpointRecord {
            source_system: Some("crowdstrike".to_string()),
            ..Default::default()
        };
        assert_eq!(record.source_name(), "crowdstrike");
    }

    #[test]
    fn test_to_raw_omits_absent_fields() {
        let record = AssetRecord {
            hostname: Some("web01".to_string()),
            source_system: Some("qualys".to_string()),
            ..Default::default()
        };
        let raw = record.to_raw();
        let obj = raw.as_object().unwrap();

        assert_eq!(obj.get("hostname").unwrap(), "web01");
        assert_eq!(obj.get("source_system").unwrap(), "qualys");
        assert!(!obj.contains_key("ip_address"));
        assert!(!obj.contains_key("extra"));
    }

    #[test]
    fn test_owner_mapping_confidence_defaults_to_one() {
        let mapping: OwnerMappingRecord =
            serde_json::from_str(r#"{"ip_address": "10.0.0.1", "source_system": "infoblox"}"#)
                .unwrap();
        assert_eq!(mapping.confidence, 1.0);
        assert_eq!(OwnerMappingRecord::default().confidence, 1.0);
    }

    #[test]
    fn test_severity_level_is_case_insensitive() {
        let vuln = VulnerabilityRecord {
            severity: "CRITICAL".to_string(),
            ..Default::default()
        };
        assert_eq!(vuln.severity_level(), Some(Severity::Critical));

        let vuln = VulnerabilityRecord {
            severity: "Informational".to_string(),
            ..Default::default()
        };
        assert_eq!(vuln.severity_level(), None);
    }

    #[test]
    fn test_severity_ordering_and_display() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(format!("{}", Severity::High), "High");
    }
}
