//! HTTP types flowing through the chain.
//!
//! Requests carry their body as raw [`Bytes`]; the JSON unit stores the
//! parsed form on the request context rather than replacing the body.
//! Responses carry a [`Body`] that is either raw bytes or a structured JSON
//! value still waiting to be serialized.

use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use serde_json::Value;

use crate::envelope::Envelope;

/// `application/json` content type.
pub const APPLICATION_JSON: &str = "application/json";

/// The HTTP request type used in the chain.
pub type Request = http::Request<Bytes>;

/// The HTTP response type used in the chain.
pub type Response = http::Response<Body>;

/// A response body: raw bytes, or a structured value pending serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Already-encoded bytes.
    Bytes(Bytes),
    /// A JSON value not yet encoded.
    Json(Value),
}

impl Body {
    /// An empty byte body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Bytes(Bytes::new())
    }

    /// Returns `true` when the body is a mapping or sequence awaiting encoding.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Json(Value::Object(_) | Value::Array(_)))
    }

    /// Returns the raw bytes, if already encoded.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Json(_) => None,
        }
    }

    /// Returns the structured value, if not yet encoded.
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Bytes(_) => None,
        }
    }

    /// Encodes the body to bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Json(value) => Bytes::from(value.to_string()),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Extension trait for building responses.
pub trait ResponseExt {
    /// Creates a response with an encoded JSON envelope body.
    ///
    /// Used by units that answer before the JSON unit has a chance to run.
    fn envelope(status: StatusCode, envelope: &Envelope) -> Response;

    /// Creates a response whose body is a structured value for the JSON unit
    /// to encode.
    fn structured(status: StatusCode, value: Value) -> Response;

    /// Creates an empty-bodied response.
    fn empty(status: StatusCode) -> Response;
}

impl ResponseExt for Response {
    fn envelope(status: StatusCode, envelope: &Envelope) -> Response {
        let mut response = http::Response::new(Body::Bytes(Bytes::from(
            envelope.to_value().to_string(),
        )));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        response
    }

    fn structured(status: StatusCode, value: Value) -> Response {
        let mut response = http::Response::new(Body::Json(value));
        *response.status_mut() = status;
        response
    }

    fn empty(status: StatusCode) -> Response {
        let mut response = http::Response::new(Body::empty());
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_response_is_encoded() {
        let response = Response::envelope(StatusCode::UNAUTHORIZED, &Envelope::error("Invalid token"));

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            APPLICATION_JSON
        );
        let bytes = response.body().as_bytes().unwrap();
        let value: Value = serde_json::from_slice(bytes).unwrap();
        assert_eq!(value, json!({"success": false, "error": "Invalid token"}));
    }

    #[test]
    fn test_structured_detection() {
        assert!(Body::Json(json!({"a": 1})).is_structured());
        assert!(Body::Json(json!([1, 2])).is_structured());
        assert!(!Body::Json(json!("text")).is_structured());
        assert!(!Body::Bytes(Bytes::from_static(b"{}")).is_structured());
    }

    #[test]
    fn test_into_bytes() {
        assert_eq!(Body::Json(json!({"a": 1})).into_bytes(), Bytes::from(r#"{"a":1}"#));
        assert_eq!(Body::empty().into_bytes(), Bytes::new());
    }
}
