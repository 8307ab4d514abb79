//! Typed configuration for the Courier gateway.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict parsing (unknown fields are errors)
//! - Layered loading (defaults → file → env)
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8052"
//! shutdown_timeout_secs = 30
//! max_body_bytes = 1048576
//!
//! [rate_limit]
//! enabled = true
//! limit = 100
//! window_seconds = 60
//!
//! [auth]
//! allow_anonymous = false
//! health_paths = ["/health", "/api/v1/health"]
//!
//! [cors]
//! allowed_origins = ["*"]
//! allowed_methods = ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
//! allowed_headers = ["Content-Type", "Authorization"]
//! max_age_secs = 86400
//!
//! [error_handling]
//! expose_internal_errors = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//! service_name = "courier"
//! ```
//!
//! # Environment Variable Overrides
//!
//! `PREFIX__SECTION__FIELD`, for example:
//!
//! - `COURIER__SERVER__HTTP_ADDR=127.0.0.1:9000`
//! - `COURIER__RATE_LIMIT__LIMIT=10`
//! - `COURIER__CORS__ALLOWED_ORIGINS=https://a.example,https://b.example`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{CourierConfig, CourierConfigBuilder};
pub use courier_telemetry::{LogConfig, LogFormat};
pub use error::ConfigError;
pub use loader::{ConfigLoader, ENV_PREFIX};
pub use schema::{AuthConfig, CorsConfig, ErrorHandlingConfig, RateLimitConfig, ServerConfig};
