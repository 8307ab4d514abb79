//! The root configuration type and its builder.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::{
    AuthConfig, ConfigError, CorsConfig, ErrorHandlingConfig, LogConfig, LogFormat,
    RateLimitConfig, ServerConfig,
};

/// Complete gateway configuration.
///
/// Every section has defaults, so an empty file is a valid configuration.
/// Use [`ConfigLoader`](crate::ConfigLoader) to layer files and environment
/// variables on top.
///
/// # Example
///
/// ```
/// use courier_config::CourierConfig;
///
/// let config = CourierConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8052");
/// assert_eq!(config.rate_limit.limit, 100);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// HTTP server.
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Authentication.
    #[serde(default)]
    pub auth: AuthConfig,

    /// CORS.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Error handling.
    #[serde(default)]
    pub error_handling: ErrorHandlingConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LogConfig,
}

impl CourierConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> CourierConfigBuilder {
        CourierConfigBuilder::new()
    }

    /// Returns the parsed bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.http_addr.parse().map_err(|_| {
            ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            )
        })
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `server.http_addr` is not a socket address
    /// - `server.max_body_bytes` is 0
    /// - `rate_limit.limit` or `rate_limit.window_seconds` is 0
    /// - `logging.level` is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than 0",
            ));
        }

        if self.rate_limit.limit == 0 {
            return Err(ConfigError::invalid_value(
                "rate_limit.limit",
                "must be greater than 0",
            ));
        }

        if self.rate_limit.window_seconds == 0 {
            return Err(ConfigError::invalid_value(
                "rate_limit.window_seconds",
                "must be greater than 0",
            ));
        }

        if let Err(e) = self.logging.filter() {
            return Err(ConfigError::invalid_value("logging.level", e.to_string()));
        }

        Ok(())
    }

    /// Development preset.
    ///
    /// - Pretty debug logs with source locations
    /// - Anonymous callers allowed
    /// - Internal error messages exposed
    ///
    /// # Example
    ///
    /// ```
    /// use courier_config::CourierConfig;
    ///
    /// let config = CourierConfig::development();
    /// assert!(config.auth.allow_anonymous);
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging = LogConfig::development();
        config.auth.allow_anonymous = true;
        config.error_handling.expose_internal_errors = true;
        config
    }

    /// Production preset.
    ///
    /// JSON logs at `info`, authentication required, internal errors hidden.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging = LogConfig::production();
        config.logging.format = LogFormat::Json;
        config.auth.allow_anonymous = false;
        config.error_handling.expose_internal_errors = false;
        config
    }
}

/// Builder for [`CourierConfig`].
#[derive(Debug, Default)]
pub struct CourierConfigBuilder {
    server: Option<ServerConfig>,
    rate_limit: Option<RateLimitConfig>,
    auth: Option<AuthConfig>,
    cors: Option<CorsConfig>,
    error_handling: Option<ErrorHandlingConfig>,
    logging: Option<LogConfig>,
}

impl CourierConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server section.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    /// Set the rate limit section.
    #[must_use]
    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    /// Set the auth section.
    #[must_use]
    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the CORS section.
    #[must_use]
    pub fn cors(mut self, cors: CorsConfig) -> Self {
        self.cors = Some(cors);
        self
    }

    /// Set the error handling section.
    #[must_use]
    pub fn error_handling(mut self, error_handling: ErrorHandlingConfig) -> Self {
        self.error_handling = Some(error_handling);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> CourierConfig {
        CourierConfig {
            server: self.server.unwrap_or_default(),
            rate_limit: self.rate_limit.unwrap_or_default(),
            auth: self.auth.unwrap_or_default(),
            cors: self.cors.unwrap_or_default(),
            error_handling: self.error_handling.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    pub fn build_validated(self) -> Result<CourierConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
