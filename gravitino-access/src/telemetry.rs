//! Logging setup.
//!
//! Filter resolution: `RUST_LOG`, else `LOG_LEVEL`, else `info`. `LOG_FORMAT=json`
//! switches to one JSON object per line.

use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Human,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Full filter directive (`RUST_LOG` syntax); wins over `default_level`.
    pub log_filter: String,
    /// Used when `log_filter` is empty.
    pub default_level: String,
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::from_vars(
            env::var("RUST_LOG").ok(),
            env::var("LOG_LEVEL").ok(),
            env::var("LOG_FORMAT").ok(),
        )
    }
}

impl TelemetryConfig {
    fn from_vars(
        rust_log: Option<String>,
        log_level: Option<String>,
        log_format: Option<String>,
    ) -> Self {
        Self {
            log_filter: rust_log.unwrap_or_default(),
            default_level: log_level
                .filter(|level| !level.trim().is_empty())
                .unwrap_or_else(|| "info".to_string()),
            log_format: LogFormat::parse(log_format.as_deref().unwrap_or_default()),
        }
    }

    fn directive(&self) -> &str {
        if self.log_filter.trim().is_empty() {
            &self.default_level
        } else {
            &self.log_filter
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_new(self.directive()).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install the global tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(config: &TelemetryConfig) {
    if tracing::dispatcher::has_been_set() {
        tracing::debug!("tracing subscriber already initialized, skipping");
        return;
    }

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .boxed(),
        LogFormat::Human => tracing_subscriber::fmt::layer().compact().boxed(),
    };

    // Another thread may have won the race since has_been_set().
    let _ = tracing_subscriber::registry()
        .with(config.filter())
        .with(fmt_layer)
        .try_init();
}
