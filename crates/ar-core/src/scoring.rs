//! Confidence scoring for asset correlation.
//!
//! Two static tables: how reliable each identifier type is for deciding that
//! two records are the same asset, and how much each source category is
//! trusted when sources disagree about a field value. These are domain trust
//! priors, not measured accuracy.

use crate::models::IdentifierType;
use std::collections::HashMap;

/// Match weights per identifier type.
pub struct MatchWeights;

impl MatchWeights {
    /// Weight for identifier names outside the table.
    pub const DEFAULT: f64 = 0.5;

    /// Returns the match weight for an identifier type.
    pub fn get(identifier_type: IdentifierType) -> f64 {
        match identifier_type {
            IdentifierType::AgentId => 0.99,
            IdentifierType::SerialNumber => 0.95,
            IdentifierType::MacAddress => 0.90,
            IdentifierType::Hostname => 0.85,
            IdentifierType::IpAddress => 0.70,
        }
    }

    /// Looks up a weight by identifier name (`"mac_address"`, ...).
    pub fn get_by_name(name: &str) -> f64 {
        IdentifierType::ALL_BY_WEIGHT
            .into_iter()
            .find(|t| t.as_str() == name)
            .map(Self::get)
            .unwrap_or(Self::DEFAULT)
    }

    /// Highest weight among matched identifier types, or 0 if none matched.
    pub fn best_match_confidence(matched_on: &[IdentifierType]) -> f64 {
        matched_on
            .iter()
            .map(|t| Self::get(*t))
            .fold(0.0, f64::max)
    }
}

/// Static trust scores per source system, keyed by lowercase name.
const SOURCE_SCORES: &[(&str, f64)] = &[
    // EDR/AV: agents on the endpoint itself
    ("edr", 0.95),
    ("crowdstrike", 0.95),
    ("crowdstrike_falcon", 0.95),
    ("defender_endpoint", 0.95),
    ("sentinelone", 0.95),
    ("carbon_black", 0.95),
    ("symantec_endpoint", 0.90),
    ("trellix", 0.90),
    ("trend_micro", 0.90),
    // XDR
    ("xdr", 0.93),
    ("cortex_xdr", 0.93),
    ("vision_one", 0.93),
    // Cloud providers are authoritative for cloud assets
    ("cloud", 0.90),
    ("aws", 0.90),
    ("azure", 0.90),
    ("gcp", 0.90),
    ("av", 0.90),
    // CMDB: maintained by hand, drifts
    ("cmdb", 0.85),
    ("servicenow", 0.85),
    ("bmc_helix", 0.85),
    // Directory services
    ("directory", 0.85),
    ("active_directory", 0.85),
    ("azure_ad", 0.85),
    // Vulnerability scanners
    ("scanner", 0.80),
    ("qualys", 0.80),
    ("nessus", 0.80),
    ("tenable", 0.80),
    ("rapid7", 0.80),
    ("openvas", 0.80),
    ("crowdstrike_scanner", 0.80),
    // IPAM: authoritative for addressing, weaker on hostnames
    ("ipam", 0.75),
    ("infoblox", 0.75),
    ("netbox", 0.75),
    ("solarwinds", 0.75),
    // NDR: passive observation
    ("ndr", 0.60),
    ("darktrace", 0.60),
    ("extrahop", 0.60),
    ("vectra", 0.60),
    // SIEM: aggregated second-hand data
    ("siem", 0.50),
    ("splunk", 0.50),
    ("sentinel", 0.50),
    ("qradar", 0.50),
];

/// Trust scores for source systems.
///
/// Lookups use the built-in table unless a configured override exists for
/// the (lowercased) source name.
#[derive(Debug, Clone, Default)]
pub struct SourceConfidence {
    overrides: HashMap<String, f64>,
}

impl SourceConfidence {
    /// Score for unknown or empty source names.
    pub const DEFAULT: f64 = 0.50;

    /// Creates a table with only the built-in scores.
    pub fn new() -> Self {
        Self::default()
    }

    /// Layers configured scores over the built-in table.
    pub fn with_overrides<I, S>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        Self {
            overrides: overrides
                .into_iter()
                .map(|(name, score)| (name.as_ref().to_lowercase(), score.clamp(0.0, 1.0)))
                .collect(),
        }
    }

    /// Built-in score for a source name, ignoring overrides.
    pub fn builtin(source_system: &str) -> f64 {
        let name = source_system.trim().to_lowercase();
        SOURCE_SCORES
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, score)| *score)
            .unwrap_or(Self::DEFAULT)
    }

    /// Returns the confidence score for a source system.
    pub fn get(&self, source_system: &str) -> f64 {
        let name = source_system.trim().to_lowercase();
        if name.is_empty() {
            return Self::DEFAULT;
        }
        match self.overrides.get(&name) {
            Some(score) => *score,
            None => Self::builtin(&name),
        }
    }
}
