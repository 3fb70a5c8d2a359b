//! Correlation keys: the normalized identifier bundle that decides whether
//! two records describe the same asset.

use crate::normalize::{
    normalize_agent_id, normalize_hostname_with, normalize_ip, normalize_mac, normalize_serial,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Types of identifiers carried by a correlation key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierType {
    /// EDR/AV agent identifier.
    AgentId,
    /// Hardware serial number.
    SerialNumber,
    /// MAC address.
    MacAddress,
    /// Hostname.
    Hostname,
    /// IPv4 or IPv6 address.
    IpAddress,
}

impl IdentifierType {
    /// All identifier types, most reliable first.
    pub const ALL_BY_WEIGHT: [IdentifierType; 5] = [
        IdentifierType::AgentId,
        IdentifierType::SerialNumber,
        IdentifierType::MacAddress,
        IdentifierType::Hostname,
        IdentifierType::IpAddress,
    ];

    /// Returns the snake_case name used in logs and exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierType::AgentId => "agent_id",
            IdentifierType::SerialNumber => "serial_number",
            IdentifierType::MacAddress => "mac_address",
            IdentifierType::Hostname => "hostname",
            IdentifierType::IpAddress => "ip_address",
        }
    }

    /// Normalizes a raw value the way keys of this type are stored.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        match self {
            IdentifierType::AgentId => normalize_agent_id(raw),
            IdentifierType::SerialNumber => normalize_serial(raw),
            IdentifierType::MacAddress => normalize_mac(raw),
            IdentifierType::Hostname => normalize_hostname_with(raw, true),
            IdentifierType::IpAddress => normalize_ip(raw),
        }
    }
}

impl std::fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentifierType::AgentId => write!(f, "Agent ID"),
            IdentifierType::SerialNumber => write!(f, "Serial Number"),
            IdentifierType::MacAddress => write!(f, "MAC Address"),
            IdentifierType::Hostname => write!(f, "Hostname"),
            IdentifierType::IpAddress => write!(f, "IP Address"),
        }
    }
}

/// A set of normalized identifiers used to match records across sources.
///
/// Two keys describe the same asset if any one identifier set intersects.
/// Values are always normalized before they are inserted, so construct keys
/// through [`KeyBuilder`] or [`CorrelationKey::insert`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorrelationKey {
    pub hostnames: BTreeSet<String>,
    pub ip_addresses: BTreeSet<String>,
    pub mac_addresses: BTreeSet<String>,
    pub serial_numbers: BTreeSet<String>,
    pub agent_ids: BTreeSet<String>,
}

impl CorrelationKey {
    /// Creates an empty key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts building a key from raw identifiers.
    pub fn builder() -> KeyBuilder {
        KeyBuilder::new(true)
    }

    /// Returns the values stored for one identifier type.
    pub fn values(&self, identifier_type: IdentifierType) -> &BTreeSet<String> {
        match identifier_type {
            IdentifierType::AgentId => &self.agent_ids,
            IdentifierType::SerialNumber => &self.serial_numbers,
            IdentifierType::MacAddress => &self.mac_addresses,
            IdentifierType::Hostname => &self.hostnames,
            IdentifierType::IpAddress => &self.ip_addresses,
        }
    }

    fn values_mut(&mut self, identifier_type: IdentifierType) -> &mut BTreeSet<String> {
        match identifier_type {
            IdentifierType::AgentId => &mut self.agent_ids,
            IdentifierType::SerialNumber => &mut self.serial_numbers,
            IdentifierType::MacAddress => &mut self.mac_addresses,
            IdentifierType::Hostname => &mut self.hostnames,
            IdentifierType::IpAddress => &mut self.ip_addresses,
        }
    }

    /// Normalizes `raw` and adds it. Returns false if it did not normalize.
    pub fn insert(&mut self, identifier_type: IdentifierType, raw: &str) -> bool {
        match identifier_type.normalize(raw) {
            Some(value) => {
                self.values_mut(identifier_type).insert(value);
                true
            }
            None => false,
        }
    }

    /// Returns true if no identifiers are present.
    pub fn is_empty(&self) -> bool {
        IdentifierType::ALL_BY_WEIGHT
            .iter()
            .all(|t| self.values(*t).is_empty())
    }

    /// Total number of identifier values across all types.
    pub fn len(&self) -> usize {
        IdentifierType::ALL_BY_WEIGHT
            .iter()
            .map(|t| self.values(*t).len())
            .sum()
    }

    /// Returns true if any identifier set intersects with `other`.
    pub fn overlaps(&self, other: &CorrelationKey) -> bool {
        IdentifierType::ALL_BY_WEIGHT
            .iter()
            .any(|t| !self.values(*t).is_disjoint(other.values(*t)))
    }

    /// Identifier types whose sets intersect with `other`, most reliable first.
    pub fn shared_identifiers(&self, other: &CorrelationKey) -> Vec<IdentifierType> {
        IdentifierType::ALL_BY_WEIGHT
            .into_iter()
            .filter(|t| !self.values(*t).is_disjoint(other.values(*t)))
            .collect()
    }

    /// Unions every identifier set of `other` into this key.
    pub fn merge(&mut self, other: &CorrelationKey) {
        for identifier_type in IdentifierType::ALL_BY_WEIGHT {
            self.values_mut(identifier_type)
                .extend(other.values(identifier_type).iter().cloned());
        }
    }

    /// Iterates `(type, value)` pairs, most reliable type first.
    pub fn iter(&self) -> impl Iterator<Item = (IdentifierType, &str)> + '_ {
        IdentifierType::ALL_BY_WEIGHT
            .into_iter()
            .flat_map(move |t| self.values(t).iter().map(move |v| (t, v.as_str())))
    }
}

/// Assembles a [`CorrelationKey`] from the optional raw fields of a record.
///
/// Identifiers that fail to normalize are silently dropped.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    key: CorrelationKey,
    strip_internal_suffixes: bool,
}

impl KeyBuilder {
    /// Creates a builder; `strip_internal_suffixes` controls hostname handling.
    pub fn new(strip_internal_suffixes: bool) -> Self {
        Self {
            key: CorrelationKey::new(),
            strip_internal_suffixes,
        }
    }

    pub fn hostname(mut self, raw: Option<&str>) -> Self {
        if let Some(value) = raw.and_then(|r| normalize_hostname_with(r, self.strip_internal_suffixes))
        {
            self.key.hostnames.insert(value);
        }
        self
    }

    pub fn ip_address(mut self, raw: Option<&str>) -> Self {
        if let Some(raw) = raw {
            self.key.insert(IdentifierType::IpAddress, raw);
        }
        self
    }

    pub fn mac_address(mut self, raw: Option<&str>) -> Self {
        if let Some(raw) = raw {
            self.key.insert(IdentifierType::MacAddress, raw);
        }
        self
    }

    pub fn serial_number(mut self, raw: Option<&str>) -> Self {
        if let Some(raw) = raw {
            self.key.insert(IdentifierType::SerialNumber, raw);
        }
        self
    }

    pub fn agent_id(mut self, raw: Option<&str>) -> Self {
        if let Some(raw) = raw {
            self.key.insert(IdentifierType::AgentId, raw);
        }
        self
    }

    pub fn build(self) -> CorrelationKey {
        self.key
    }
}
