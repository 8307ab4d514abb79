//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration could not be produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("config file {} does not exist", path.display())]
    FileNotFound {
        /// The requested path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read config file {}", path.display())]
    Read {
        /// The file being read.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax error, type mismatch or unknown field.
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON syntax error, type mismatch or unknown field.
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither `toml` nor `json`.
    #[error("unsupported config format '{0}' (expected toml or json)")]
    UnsupportedFormat(String),

    /// A value parsed but failed validation.
    #[error("{field}: {reason}")]
    InvalidValue {
        /// Dotted field path, e.g. `rate_limit.limit`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A `COURIER__*` override could not be applied.
    #[error("environment override {var}: {reason}")]
    EnvVar {
        /// The variable name.
        var: String,
        /// What is wrong with it.
        reason: String,
    },

    /// `.env` exists but is malformed.
    #[error("cannot load .env: {0}")]
    Dotenv(String),
}

impl ConfigError {
    pub(crate) fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Builds an [`ConfigError::InvalidValue`].
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env_var(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvVar {
            var: var.into(),
            reason: reason.into(),
        }
    }
}
