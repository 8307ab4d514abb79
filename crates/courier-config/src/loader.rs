//! Layered configuration loading.
//!
//! Layers, later ones winning:
//! 1. Built-in defaults (or a preset)
//! 2. A TOML or JSON file
//! 3. `PREFIX__SECTION__FIELD` environment variables

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, CourierConfig, LogFormat};

/// Default environment variable prefix.
pub const ENV_PREFIX: &str = "COURIER";

/// Configuration loader.
///
/// # Example
///
/// ```no_run
/// use courier_config::ConfigLoader;
///
/// # fn main() -> Result<(), courier_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_dotenv()?
///     .with_optional_file("courier.toml")?
///     .with_env_prefix("COURIER")
///     .load()?;
///
/// println!("listening on {}", config.server.http_addr);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: CourierConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader seeded with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CourierConfig::default(),
            env_prefix: None,
        }
    }

    /// Start from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = CourierConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = CourierConfig::production();
        self
    }

    /// Load a configuration file.
    ///
    /// The format follows the extension: `.toml` or `.json`. The file
    /// replaces the current layer; sections and fields it omits take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, malformed,
    /// or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        self.config = parse(&content, format)?;
        Ok(self)
    }

    /// Load a configuration file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the named format.
    ///
    /// # Example
    ///
    /// ```
    /// use courier_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[rate_limit]\nlimit = 10", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.rate_limit.limit, 10);
    /// assert_eq!(config.rate_limit.window_seconds, 60);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, format)?;
        Ok(self)
    }

    /// Set the environment variable prefix for overrides.
    ///
    /// With prefix `COURIER`, `COURIER__RATE_LIMIT__LIMIT=10` sets
    /// `rate_limit.limit`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file from the working directory, if there is one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::Dotenv(e.to_string())),
        }
    }

    /// Apply environment overrides and validate.
    pub fn load(mut self) -> Result<CourierConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_vars(env::vars(), &prefix)?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Return the configuration without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> CourierConfig {
        self.config
    }

    // Applies every variable under `prefix`, in a stable order.
    fn apply_env_vars<I>(&mut self, vars: I, prefix: &str) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{prefix}__");
        let vars: BTreeMap<String, String> = vars
            .into_iter()
            .filter(|(k, _)| k.starts_with(&marker))
            .collect();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let path = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_var(key, "invalid key format"))?;

        let parts: Vec<&str> = path.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_int(key, value)?;
            }
            ["SERVER", "MAX_BODY_BYTES"] => config.server.max_body_bytes = parse_int(key, value)?,

            ["RATE_LIMIT", "ENABLED"] => config.rate_limit.enabled = parse_bool(key, value)?,
            ["RATE_LIMIT", "LIMIT"] => config.rate_limit.limit = parse_int(key, value)?,
            ["RATE_LIMIT", "WINDOW_SECONDS"] => {
                config.rate_limit.window_seconds = parse_int(key, value)?;
            }

            ["AUTH", "ALLOW_ANONYMOUS"] => config.auth.allow_anonymous = parse_bool(key, value)?,
            ["AUTH", "HEALTH_PATHS"] => config.auth.health_paths = parse_list(value),

            ["CORS", "ALLOWED_ORIGINS"] => config.cors.allowed_origins = parse_list(value),
            ["CORS", "ALLOWED_METHODS"] => config.cors.allowed_methods = parse_list(value),
            ["CORS", "ALLOWED_HEADERS"] => config.cors.allowed_headers = parse_list(value),
            ["CORS", "MAX_AGE_SECS"] => {
                config.cors.max_age_secs = if value.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(parse_int(key, value)?)
                };
            }

            ["ERROR_HANDLING", "EXPOSE_INTERNAL_ERRORS"] => {
                config.error_handling.expose_internal_errors = parse_bool(key, value)?;
            }

            ["LOGGING", "ENABLED"] => config.logging.enabled = parse_bool(key, value)?,
            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = value
                    .parse::<LogFormat>()
                    .map_err(|_| ConfigError::env_var(key, "expected 'json' or 'pretty'"))?;
            }
            ["LOGGING", "INCLUDE_LOCATION"] => {
                config.logging.include_location = parse_bool(key, value)?;
            }
            ["LOGGING", "SERVICE_NAME"] => config.logging.service_name = value.to_string(),

            _ => {
                return Err(ConfigError::env_var(
                    key,
                    "unknown configuration field",
                ))
            }
        }

        Ok(())
    }
}

fn parse(content: &str, format: &str) -> Result<CourierConfig, ConfigError> {
    match format.to_lowercase().as_str() {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_var(key, "expected boolean")),
    }
}

fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_var(key, "expected integer"))
}

// Comma separated; blank entries dropped.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
