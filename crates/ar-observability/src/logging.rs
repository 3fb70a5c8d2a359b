//! Logging setup for Asset Reconciler.
//!
//! Structured logging through the tracing ecosystem, as text for terminals
//! or JSON for log shipping.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level applied to the engine crates when `RUST_LOG` is unset.
    pub level: Level,
    /// Emit one JSON object per event.
    pub json_format: bool,
    /// Log span open/close, e.g. per ingest batch.
    pub include_spans: bool,
    /// Include file and line.
    pub include_location: bool,
    pub include_thread_ids: bool,
    /// Include the module path.
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            include_spans: false,
            include_location: false,
            include_thread_ids: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Verbose text output with per-match debug events.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            json_format: false,
            include_spans: true,
            include_location: true,
            include_thread_ids: true,
            include_target: true,
        }
    }

    /// JSON output at info level.
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            json_format: true,
            include_spans: false,
            include_location: false,
            include_thread_ids: false,
            include_target: true,
        }
    }

    /// Filter used when `RUST_LOG` is not set.
    pub fn default_filter(&self) -> String {
        format!("ar_core={},ar_observability={}", self.level, self.level)
    }
}

/// Initializes logging with the default configuration.
pub fn init_logging() {
    init_logging_with_config(LoggingConfig::default());
}

/// Initializes logging with the given configuration.
///
/// Installs the global subscriber; panics if one is already set.
pub fn init_logging_with_config(config: LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter()));

    let span_events = if config.include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    } else {
        let fmt_layer = fmt::layer()
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }
}

/// Creates a span around the ingestion of one source's feed.
#[macro_export]
macro_rules! ingest_span {
    ($source:expr) => {
        tracing::info_span!("ingest", source = %$source)
    };
    ($source:expr, $($field:tt)*) => {
        tracing::info_span!("ingest", source = %$source, $($field)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.json_format);
    }

    #[test]
    fn test_production_config() {
        let config = LoggingConfig::production();
        assert!(config.json_format);
        assert!(!config.include_location);
    }

    #[test]
    fn test_development_config() {
        let config = LoggingConfig::development();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.include_spans);
    }

    #[test]
    fn test_default_filter_names_engine_crates() {
        let filter = LoggingConfig::development().default_filter();
        assert_eq!(filter, "ar_core=DEBUG,ar_observability=DEBUG");
    }

    #[test]
    fn test_ingest_span_macro() {
        let span = ingest_span!("qualys");
        let _guard = span.enter();
        let span = ingest_span!("crowdstrike", batch = 3);
        let _guard = span.enter();
    }
}
