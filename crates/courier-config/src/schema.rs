//! Configuration sections.

use serde::{Deserialize, Serialize};

/// HTTP server section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8052").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Seconds to wait for in-flight connections on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Largest accepted request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8052".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Rate limiting section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Include the rate limit stage in the chain.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests allowed per client per window.
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Window length in seconds.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: default_limit(),
            window_seconds: default_window_seconds(),
        }
    }
}

fn default_limit() -> u64 {
    100
}

fn default_window_seconds() -> u64 {
    60
}

/// Authentication section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Let requests without an `Authorization` header through as anonymous.
    #[serde(default)]
    pub allow_anonymous: bool,

    /// Paths that skip authentication entirely.
    #[serde(default = "default_health_paths")]
    pub health_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allow_anonymous: false,
            health_paths: default_health_paths(),
        }
    }
}

fn default_health_paths() -> Vec<String> {
    vec!["/health".to_string(), "/api/v1/health".to_string()]
}

/// CORS section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins; `"*"` allows any.
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,

    /// Methods advertised on preflight.
    #[serde(default = "default_methods")]
    pub allowed_methods: Vec<String>,

    /// Headers advertised on preflight.
    #[serde(default = "default_headers")]
    pub allowed_headers: Vec<String>,

    /// Preflight cache lifetime; `None` omits `Access-Control-Max-Age`.
    #[serde(default = "default_max_age")]
    pub max_age_secs: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_origins(),
            allowed_methods: default_methods(),
            allowed_headers: default_headers(),
            max_age_secs: default_max_age(),
        }
    }
}

fn default_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_headers() -> Vec<String> {
    vec!["Content-Type".to_string(), "Authorization".to_string()]
}

#[allow(clippy::unnecessary_wraps)]
fn default_max_age() -> Option<u64> {
    Some(86_400)
}

/// Error handling section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ErrorHandlingConfig {
    /// Put internal error messages in responses instead of a generic one.
    #[serde(default)]
    pub expose_internal_errors: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, "0.0.0.0:8052");
        assert_eq!(config.shutdown_timeout_secs, 30);
        assert_eq!(config.max_body_bytes, 1_048_576);
    }

    #[test]
    fn test_rate_limit_defaults() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.limit, 100);
        assert_eq!(config.window_seconds, 60);
    }

    #[test]
    fn test_auth_defaults() {
        let config = AuthConfig::default();
        assert!(!config.allow_anonymous);
        assert_eq!(config.health_paths, vec!["/health", "/api/v1/health"]);
    }

    #[test]
    fn test_cors_defaults() {
        let config = CorsConfig::default();
        assert_eq!(config.allowed_origins, vec!["*"]);
        assert_eq!(config.allowed_methods.join(", "), "GET, POST, PUT, DELETE, OPTIONS");
        assert_eq!(config.allowed_headers.join(", "), "Content-Type, Authorization");
        assert_eq!(config.max_age_secs, Some(86_400));
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: RateLimitConfig = toml::from_str("limit = 5").unwrap();
        assert_eq!(config.limit, 5);
        assert_eq!(config.window_seconds, 60);
        assert!(config.enabled);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = toml::from_str::<ServerConfig>("port = 8080");
        assert!(result.is_err());
    }
}
