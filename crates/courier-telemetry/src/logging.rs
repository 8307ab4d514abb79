//! Structured logging.
//!
//! JSON output for production, a human-readable pretty format for
//! development. The level string is an [`EnvFilter`] directive, so it may
//! carry per-target overrides (`info,courier_router=debug`).
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(command = "agents.list_agents", "dispatching");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// How events are rendered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line, human-readable.
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(TelemetryError::InvalidConfig(format!(
                "unknown log format '{other}', expected 'json' or 'pretty'"
            ))),
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Install a subscriber at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g. "info", "debug", "info,courier_router=debug").
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Print file and line of each event.
    #[serde(default)]
    pub include_location: bool,

    /// Print the event's module path.
    #[serde(default = "default_true")]
    pub include_target: bool,

    /// Service name attached to the startup event.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "courier".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_level(),
            format: LogFormat::Json,
            include_location: false,
            include_target: true,
            service_name: default_service_name(),
        }
    }
}

impl LogConfig {
    /// Debug level, pretty output with locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            include_location: true,
            ..Self::default()
        }
    }

    /// Info level, JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Parses the level into a filter.
    pub fn filter(&self) -> TelemetryResult<EnvFilter> {
        create_env_filter(&self.level)
    }
}

/// Installs the global subscriber described by `config`.
///
/// A disabled config installs nothing.
///
/// # Errors
///
/// `TelemetryError::InvalidConfig` for a malformed level,
/// `TelemetryError::LoggingInit` when a global subscriber already exists.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(fmt_layer(config).with_filter(config.filter()?))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        level = %config.level,
        format = ?config.format,
        "logging initialized"
    );
    Ok(())
}

// One formatter per output format, erased so the filter wraps either.
fn fmt_layer<S>(config: &LogConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_target);

    match config.format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
    }
}

/// Parses a filter directive such as `info,courier_router=debug`.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::InvalidConfig(format!("invalid log level: {e}")))
}
