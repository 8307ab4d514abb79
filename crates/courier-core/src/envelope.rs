//! The uniform response envelope.
//!
//! Every command result and every error produced anywhere in the chain is
//! rendered as one of two shapes:
//!
//! ```json
//! { "success": true,  "data": <any> }
//! { "success": false, "error": "<message>", "details": <any> }
//! ```
//!
//! `details` is optional and omitted when absent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A success or failure envelope.
///
/// Construct with [`Envelope::ok`] or [`Envelope::error`]; the constructors
/// are the only way to build one, which keeps the `success`/`data`/`error`
/// combination consistent.
///
/// # Example
///
/// ```
/// use courier_core::Envelope;
/// use serde_json::json;
///
/// let ok = Envelope::ok(json!({"id": "a1"}));
/// assert!(ok.is_success());
/// assert_eq!(ok.to_value(), json!({"success": true, "data": {"id": "a1"}}));
///
/// let err = Envelope::error("Invalid token");
/// assert_eq!(err.to_value(), json!({"success": false, "error": "Invalid token"}));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl Envelope {
    /// Creates a success envelope carrying `data`.
    ///
    /// A `null` payload is still serialized as `"data": null` so the
    /// success shape always has a `data` key.
    #[must_use]
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
        }
    }

    /// Creates a failure envelope with the given message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            details: None,
        }
    }

    /// Attaches a `details` payload. Ignored on success envelopes.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        if !self.success {
            self.details = Some(details);
        }
        self
    }

    /// Returns `true` for a success envelope.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the success payload.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Returns the failure message.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the failure details, if any.
    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Renders the envelope as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("success".to_string(), Value::Bool(self.success));
        if let Some(data) = &self.data {
            map.insert("data".to_string(), data.clone());
        }
        if let Some(error) = &self.error {
            map.insert("error".to_string(), Value::String(error.clone()));
        }
        if let Some(details) = &self.details {
            map.insert("details".to_string(), details.clone());
        }
        Value::Object(map)
    }
}
