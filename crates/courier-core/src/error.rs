//! Error types for Courier.
//!
//! This module provides the [`GatewayError`] type, the single error type that
//! flows through units and dispatchers, and [`ErrorKind`], which classifies
//! it and owns the mapping to HTTP status codes.
//!
//! | `ErrorKind` | HTTP status |
//! |---|---|
//! | `Parse` | 400 |
//! | `Validation` | 400 |
//! | `Authentication` | 401 |
//! | `NotFound` | 404 |
//! | `RateLimited` | 429 |
//! | `Internal` | 500 |
//! | `NotImplemented` | 501 |
//! | `Collaborator` | 502 |
//!
//! The `Display` output of a [`GatewayError`] is exactly the message shown to
//! the caller in the envelope's `error` field.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::envelope::Envelope;
use crate::types::{Response, ResponseExt};

/// Result type alias using [`GatewayError`].
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed command string or malformed JSON body.
    Parse,
    /// Missing or invalid required parameter.
    Validation,
    /// Malformed or rejected credential.
    Authentication,
    /// Referenced entity does not exist.
    NotFound,
    /// Client exceeded its request budget.
    RateLimited,
    /// Unanticipated failure.
    Internal,
    /// Module is registered but has no collaborator bound.
    NotImplemented,
    /// An external system failed.
    Collaborator,
}

impl ErrorKind {
    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Parse | Self::Validation => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::Collaborator => StatusCode::BAD_GATEWAY,
        }
    }

    /// Returns `true` if retrying the same request cannot succeed.
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        matches!(
            self,
            Self::Parse
                | Self::Validation
                | Self::Authentication
                | Self::NotFound
                | Self::RateLimited
        )
    }
}

/// Standard error type for Courier.
///
/// # Example
///
/// ```
/// use courier_core::{ErrorKind, GatewayError};
///
/// fn require_name(name: Option<&str>) -> Result<&str, GatewayError> {
///     name.ok_or_else(|| GatewayError::validation("Missing required parameter(s): name"))
/// }
///
/// let err = require_name(None).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::Validation);
/// assert_eq!(err.to_string(), "Missing required parameter(s): name");
/// ```
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Malformed command string or body.
    #[error("{message}")]
    Parse {
        /// Human-readable error message.
        message: String,
    },

    /// Missing or invalid parameter.
    #[error("{message}")]
    Validation {
        /// Human-readable error message.
        message: String,
        /// The offending parameter names.
        fields: Vec<String>,
    },

    /// Malformed or rejected credential.
    #[error("{message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// Referenced entity does not exist.
    #[error("{message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
        /// The kind of entity that was looked up.
        resource_type: Option<String>,
        /// The identifier that was looked up.
        resource_id: Option<String>,
    },

    /// Rate limit exceeded.
    #[error("{message}")]
    RateLimited {
        /// Human-readable error message.
        message: String,
        /// Seconds until the window resets.
        retry_after_seconds: Option<u64>,
    },

    /// Module has no collaborator bound.
    #[error("{message}")]
    NotImplemented {
        /// Human-readable error message.
        message: String,
    },

    /// An external system failed.
    #[error("{message}")]
    Collaborator {
        /// Human-readable error message, prefixed with the failing operation.
        message: String,
        /// Name of the collaborator that failed.
        service: Option<String>,
    },

    /// Unanticipated failure.
    #[error("{message}")]
    Internal {
        /// Human-readable error message (not exposed to clients by default).
        message: String,
    },
}

impl GatewayError {
    /// Creates a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a validation error without field context.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Creates a validation error naming the missing parameters.
    #[must_use]
    pub fn missing_params<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        Self::Validation {
            message: format!("Missing required parameter(s): {}", fields.join(", ")),
            fields,
        }
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource_type: None,
            resource_id: None,
        }
    }

    /// Creates a not found error with resource context.
    #[must_use]
    pub fn not_found_resource(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        let resource_id = resource_id.into();
        Self::NotFound {
            message: format!("{resource_type} not found: {resource_id}"),
            resource_type: Some(resource_type),
            resource_id: Some(resource_id),
        }
    }

    /// Creates a rate limited error.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>, retry_after_seconds: Option<u64>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after_seconds,
        }
    }

    /// Creates a not implemented error.
    #[must_use]
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented {
            message: message.into(),
        }
    }

    /// Creates a collaborator error.
    #[must_use]
    pub fn collaborator(message: impl Into<String>, service: Option<&str>) -> Self {
        Self::Collaborator {
            message: message.into(),
            service: service.map(ToString::to_string),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::NotImplemented { .. } => ErrorKind::NotImplemented,
            Self::Collaborator { .. } => ErrorKind::Collaborator,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    /// Prefixes the message with the operation that failed.
    ///
    /// Used at dispatcher boundaries to produce `"<context>: <message>"`.
    #[must_use]
    pub fn context(self, context: &str) -> Self {
        match self {
            Self::Collaborator { message, service } => Self::Collaborator {
                message: format!("{context}: {message}"),
                service,
            },
            Self::Internal { message } => Self::Internal {
                message: format!("{context}: {message}"),
            },
            other => other,
        }
    }

    /// Converts this error to a failure envelope.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        let envelope = Envelope::error(self.to_string());
        match self.details() {
            Some(details) => envelope.with_details(details),
            None => envelope,
        }
    }

    /// Converts this error to a JSON response with the matching status code.
    #[must_use]
    pub fn into_response(self) -> Response {
        Response::envelope(self.status_code(), &self.to_envelope())
    }

    fn details(&self) -> Option<Value> {
        match self {
            Self::Validation { fields, .. } if !fields.is_empty() => {
                Some(serde_json::json!({ "missing": fields }))
            }
            Self::NotFound {
                resource_type: Some(rt),
                resource_id: Some(rid),
                ..
            } => Some(serde_json::json!({
                "resource_type": rt,
                "resource_id": rid
            })),
            Self::RateLimited {
                retry_after_seconds: Some(seconds),
                ..
            } => Some(serde_json::json!({
                "retry_after_seconds": seconds
            })),
            Self::Collaborator {
                service: Some(svc), ..
            } => Some(serde_json::json!({
                "service": svc
            })),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::parse("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(GatewayError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            GatewayError::authentication("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(GatewayError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            GatewayError::rate_limited("x", None).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            GatewayError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::not_implemented("x").status_code(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            GatewayError::collaborator("x", None).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_missing_params_names_every_key() {
        let err = GatewayError::missing_params(["name", "type"]);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "Missing required parameter(s): name, type");
        assert_eq!(
            err.to_envelope().details(),
            Some(&json!({"missing": ["name", "type"]}))
        );
    }

    #[test]
    fn test_context_prefixes_collaborator_message() {
        let err = GatewayError::collaborator("connection refused", Some("agents"))
            .context("Error creating agent");
        assert_eq!(err.to_string(), "Error creating agent: connection refused");
    }

    #[test]
    fn test_context_leaves_client_errors_alone() {
        let err = GatewayError::not_found("Agent not found: a1").context("Error getting agent");
        assert_eq!(err.to_string(), "Agent not found: a1");
    }

    #[test]
    fn test_not_found_resource_envelope() {
        let envelope = GatewayError::not_found_resource("Agent", "a1").to_envelope();
        assert_eq!(envelope.error_message(), Some("Agent not found: a1"));
        assert_eq!(
            envelope.details(),
            Some(&json!({"resource_type": "Agent", "resource_id": "a1"}))
        );
    }

    #[test]
    fn test_client_error_classification() {
        assert!(ErrorKind::Parse.is_client_error());
        assert!(ErrorKind::RateLimited.is_client_error());
        assert!(!ErrorKind::Collaborator.is_client_error());
        assert!(!ErrorKind::Internal.is_client_error());
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::NotImplemented).unwrap();
        assert_eq!(json, "\"not_implemented\"");
    }
}
