//! Liveness payload for `/health` and `/api/v1/health`.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Body returned by the health endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// Always `true`: the endpoint only answers while the process is up.
    pub success: bool,
    /// `"healthy"`.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Seconds since the server started.
    pub uptime_seconds: u64,
    /// RFC 3339 time of the check.
    pub timestamp: String,
}

/// Produces [`HealthStatus`] values.
///
/// # Example
///
/// ```
/// use courier_server::HealthCheck;
///
/// let health = HealthCheck::new("courier", "0.1.0");
/// let status = health.status();
/// assert!(status.success);
/// assert_eq!(status.status, "healthy");
/// assert_eq!(status.service, "courier");
/// ```
#[derive(Debug, Clone)]
pub struct HealthCheck {
    service: String,
    version: String,
    started_at: Instant,
}

impl HealthCheck {
    /// Creates a health check; uptime counts from now.
    #[must_use]
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            started_at: Instant::now(),
        }
    }

    /// Returns the time since creation.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        HealthStatus {
            success: true,
            status: "healthy".to_string(),
            service: self.service.clone(),
            version: self.version.clone(),
            uptime_seconds: self.uptime().as_secs(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
