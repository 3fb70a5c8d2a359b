//! YAML configuration for the correlation engine.
//!
//! ```yaml
//! normalization:
//!   strip_internal_suffixes: true
//! source_confidence:
//!   homegrown_inventory: 0.82
//! enrichment:
//!   deduplicate: true
//!   gap_sources:
//!     - [qualys, crowdstrike]
//!     - [darktrace, crowdstrike]
//! ```
//!
//! `${VAR}` references anywhere in the file are replaced from the
//! environment before parsing.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML configuration: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

fn default_true() -> bool {
    true
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Identifier normalization settings.
    #[serde(default)]
    pub normalization: NormalizationConfig,
    /// Trust scores that replace or extend the built-in source table.
    #[serde(default)]
    pub source_confidence: HashMap<String, f64>,
    /// Post-ingestion enrichment settings.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

/// Identifier normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizationConfig {
    /// Strip one internal DNS suffix (`.local`, `.corp`, ...) from hostnames.
    #[serde(default = "default_true")]
    pub strip_internal_suffixes: bool,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            strip_internal_suffixes: true,
        }
    }
}

/// What to run once ingestion has finished.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichmentConfig {
    /// Run deduplication after ingestion.
    #[serde(default = "default_true")]
    pub deduplicate: bool,
    /// Pairs of sources to compare for coverage gaps.
    #[serde(default)]
    pub gap_sources: Vec<Vec<String>>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            deduplicate: true,
            gap_sources: Vec::new(),
        }
    }
}

impl EnrichmentConfig {
    /// Iterates the configured `(source_a, source_b)` pairs.
    ///
    /// Entries that are not exactly two names are skipped; `validate` rejects
    /// them at load time.
    pub fn gap_pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.gap_sources.iter().filter_map(|pair| match pair.as_slice() {
            [a, b] => Some((a.as_str(), b.as_str())),
            _ => None,
        })
    }
}

impl EngineConfig {
    /// Loads, substitutes and validates a configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parses and validates configuration from a YAML string.
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let content = substitute_env_vars(content)?;
        let config: EngineConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges and gap pair shapes.
    pub fn validate(&self) -> ConfigResult<()> {
        for (source, score) in &self.source_confidence {
            if source.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "source_confidence keys must not be empty".to_string(),
                ));
            }
            if !(0.0..=1.0).contains(score) {
                return Err(ConfigError::InvalidValue(format!(
                    "source_confidence.{} must be between 0 and 1, got {}",
                    source, score
                )));
            }
        }

        for (i, pair) in self.enrichment.gap_sources.iter().enumerate() {
            if pair.len() != 2 || pair.iter().any(|s| s.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(format!(
                    "enrichment.gap_sources[{}] must name exactly two sources",
                    i
                )));
            }
        }

        Ok(())
    }
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid regex for env vars")
    })
}

/// Replaces `${VAR}` references with environment values.
fn substitute_env_vars(input: &str) -> ConfigResult<String> {
    let mut result = input.to_string();
    let mut missing = Vec::new();

    for cap in env_var_pattern().captures_iter(input) {
        let (full_match, [var_name]) = cap.extract();
        match env::var(var_name) {
            Ok(value) => result = result.replace(full_match, &value),
            Err(_) => missing.push(var_name.to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(ConfigError::EnvVarNotFound(missing.join(", ")));
    }
    Ok(result)
}
