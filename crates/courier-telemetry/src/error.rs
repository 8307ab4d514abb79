//! Telemetry error types.

use thiserror::Error;

/// Why logging could not be set up.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("cannot install log subscriber: {0}")]
    LoggingInit(String),

    /// The `[logging]` section is unusable.
    #[error("bad logging config: {0}")]
    InvalidConfig(String),
}
