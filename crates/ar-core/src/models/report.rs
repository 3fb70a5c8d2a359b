//! Match results and coverage gap reports.

use super::key::{CorrelationKey, IdentifierType};
use serde::{Deserialize, Serialize};

/// Result of matching a correlation key against the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Whether any existing asset carries one of the key's identifiers.
    pub matched: bool,
    /// Weight of the identifier type that decided the match.
    pub confidence: f64,
    /// Identifier types that matched at the winning weight.
    pub matched_on: Vec<IdentifierType>,
    /// Store position of the matched asset.
    pub asset_index: Option<usize>,
}

impl MatchResult {
    /// A result for a key that matched nothing.
    pub fn no_match() -> Self {
        Self::default()
    }
}

/// Coverage comparison of asset presence between two sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapReport {
    pub source_a: String,
    pub source_b: String,
    /// Assets reported by both sources.
    pub in_both: Vec<CorrelationKey>,
    /// Assets reported by A and missing from B.
    pub in_a_not_b: Vec<CorrelationKey>,
    /// Assets reported by B and missing from A.
    pub in_b_not_a: Vec<CorrelationKey>,
}

impl GapReport {
    /// Creates an empty report for two sources.
    pub fn new(source_a: impl Into<String>, source_b: impl Into<String>) -> Self {
        Self {
            source_a: source_a.into(),
            source_b: source_b.into(),
            in_both: Vec::new(),
            in_a_not_b: Vec::new(),
            in_b_not_a: Vec::new(),
        }
    }

    /// Number of assets seen by source A.
    pub fn total_a(&self) -> usize {
        self.in_a_not_b.len() + self.in_both.len()
    }

    /// Number of assets seen by source B.
    pub fn total_b(&self) -> usize {
        self.in_b_not_a.len() + self.in_both.len()
    }

    /// Fraction of source A assets also found in source B; 0 if A saw nothing.
    pub fn coverage_a_to_b(&self) -> f64 {
        ratio(self.in_both.len(), self.total_a())
    }

    /// Fraction of source B assets also found in source A; 0 if B saw nothing.
    pub fn coverage_b_to_a(&self) -> f64 {
        ratio(self.in_both.len(), self.total_b())
    }

    /// Counts and ratios without the key lists.
    pub fn summary(&self) -> GapSummary {
        GapSummary {
            source_a: self.source_a.clone(),
            source_b: self.source_b.clone(),
            in_both: self.in_both.len(),
            in_a_not_b: self.in_a_not_b.len(),
            in_b_not_a: self.in_b_not_a.len(),
            coverage_a_to_b: self.coverage_a_to_b(),
            coverage_b_to_a: self.coverage_b_to_a(),
        }
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Compact form of a [`GapReport`] for logs and dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapSummary {
    pub source_a: String,
    pub source_b: String,
    pub in_both: usize,
    pub in_a_not_b: usize,
    pub in_b_not_a: usize,
    pub coverage_a_to_b: f64,
    pub coverage_b_to_a: f64,
}

impl std::fmt::Display for GapSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} vs {}: {} only in {}, {} only in {}, {} in both ({:.1}% / {:.1}% coverage)",
            self.source_a,
            self.source_b,
            self.in_a_not_b,
            self.source_a,
            self.in_b_not_a,
            self.source_b,
            self.in_both,
            self.coverage_a_to_b * 100.0,
            self.coverage_b_to_a * 100.0
        )
    }
}
