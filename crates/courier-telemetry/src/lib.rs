//! Structured logging for the Courier gateway.
//!
//! Every crate in the workspace logs through `tracing` macros with
//! structured fields. This crate installs the global subscriber that
//! renders those events.
//!
//! | Format   | Use                          |
//! |----------|------------------------------|
//! | `json`   | production, log shipping     |
//! | `pretty` | local development            |
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_telemetry::{init_logging, LogConfig};
//!
//! fn main() -> Result<(), courier_telemetry::TelemetryError> {
//!     init_logging(&LogConfig::production())?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/courier-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
