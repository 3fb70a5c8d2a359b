//! Inverted identifier indexes and the weighted matcher.

use crate::models::{CorrelationKey, IdentifierType, MatchResult};
use crate::scoring::MatchWeights;
use std::collections::HashMap;

type PositionMap = HashMap<String, Vec<usize>>;

/// Five inverted indexes, one per identifier type, mapping a normalized
/// identifier value to the store positions carrying it.
///
/// A value may point at more than one position until a deduplication pass
/// merges those assets and the index is rebuilt.
#[derive(Debug, Clone, Default)]
pub struct MatchIndex {
    agent_ids: PositionMap,
    serial_numbers: PositionMap,
    mac_addresses: PositionMap,
    hostnames: PositionMap,
    ip_addresses: PositionMap,
}

impl MatchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, identifier_type: IdentifierType) -> &PositionMap {
        match identifier_type {
            IdentifierType::AgentId => &self.agent_ids,
            IdentifierType::SerialNumber => &self.serial_numbers,
            IdentifierType::MacAddress => &self.mac_addresses,
            IdentifierType::Hostname => &self.hostnames,
            IdentifierType::IpAddress => &self.ip_addresses,
        }
    }

    fn map_mut(&mut self, identifier_type: IdentifierType) -> &mut PositionMap {
        match identifier_type {
            IdentifierType::AgentId => &mut self.agent_ids,
            IdentifierType::SerialNumber => &mut self.serial_numbers,
            IdentifierType::MacAddress => &mut self.mac_addresses,
            IdentifierType::Hostname => &mut self.hostnames,
            IdentifierType::IpAddress => &mut self.ip_addresses,
        }
    }

    /// Registers every identifier of `key` against `position`.
    ///
    /// Idempotent: an existing (value, position) pair is left alone.
    pub fn register(&mut self, position: usize, key: &CorrelationKey) {
        for (identifier_type, value) in key.iter() {
            let positions = self
                .map_mut(identifier_type)
                .entry(value.to_string())
                .or_default();
            if !positions.contains(&position) {
                positions.push(position);
            }
        }
    }

    /// Store positions recorded for one identifier value.
    pub fn positions(&self, identifier_type: IdentifierType, value: &str) -> &[usize] {
        self.map(identifier_type)
            .get(value)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of distinct values indexed for one identifier type.
    pub fn len(&self, identifier_type: IdentifierType) -> usize {
        self.map(identifier_type).len()
    }

    pub fn is_empty(&self) -> bool {
        IdentifierType::ALL_BY_WEIGHT
            .iter()
            .all(|t| self.map(*t).is_empty())
    }

    pub fn clear(&mut self) {
        for identifier_type in IdentifierType::ALL_BY_WEIGHT {
            self.map_mut(identifier_type).clear();
        }
    }

    /// Discards every entry and re-registers `keys` by their position.
    pub fn rebuild<'a, I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = &'a CorrelationKey>,
    {
        self.clear();
        for (position, key) in keys.into_iter().enumerate() {
            self.register(position, key);
        }
    }

    /// Finds the best existing asset for `key`.
    ///
    /// Identifier types are scanned from highest to lowest weight. A strictly
    /// higher weight takes over the match, using the first position recorded
    /// for that value; an equal weight only adds to `matched_on`. This is an
    /// optimistic single-candidate match: when a key's identifiers point at
    /// different assets, reconciling them is left to deduplication.
    pub fn find_match(&self, key: &CorrelationKey) -> MatchResult {
        let mut best: Option<usize> = None;
        let mut best_confidence = 0.0;
        let mut matched_on = Vec::new();

        for identifier_type in IdentifierType::ALL_BY_WEIGHT {
            let index = self.map(identifier_type);
            for value in key.values(identifier_type) {
                let Some(&position) = index.get(value).and_then(|p| p.first()) else {
                    continue;
                };
                let weight = MatchWeights::get(identifier_type);
                if weight > best_confidence {
                    best_confidence = weight;
                    best = Some(position);
                    matched_on = vec![identifier_type];
                } else if weight == best_confidence && best.is_some() {
                    matched_on.push(identifier_type);
                }
            }
        }

        match best {
            Some(position) => MatchResult {
                matched: true,
                confidence: best_confidence,
                matched_on,
                asset_index: Some(position),
            },
            None => MatchResult::no_match(),
        }
    }
}
