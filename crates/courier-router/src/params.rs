//! Command parameter bag.

use courier_core::GatewayError;
use serde_json::{Map, Value};

/// The parameters passed alongside a command.
///
/// # Example
///
/// ```
/// use courier_router::Params;
/// use serde_json::json;
///
/// let params = Params::from_value(json!({"id": "a-1", "key": null})).unwrap();
/// assert_eq!(params.str("id").unwrap(), "a-1");
///
/// let err = params.require(&["id", "key", "value"]).unwrap_err();
/// assert_eq!(err.to_string(), "Missing required parameter(s): key, value");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    /// Creates an empty parameter bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a JSON value into parameters.
    ///
    /// `null` yields an empty bag; anything other than an object is rejected.
    pub fn from_value(value: Value) -> Result<Self, GatewayError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            _ => Err(GatewayError::validation("params must be a JSON object")),
        }
    }

    /// Checks that every key in `required` is present and not `null`.
    pub fn require(&self, required: &[&str]) -> Result<(), GatewayError> {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|key| self.get(key).is_none())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::missing_params(missing))
        }
    }

    /// Returns a non-null value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Returns a string parameter.
    ///
    /// Numbers are accepted and rendered, since ids often arrive unquoted.
    pub fn str(&self, key: &str) -> Result<String, GatewayError> {
        match self.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(_) => Err(GatewayError::validation(format!(
                "Parameter '{key}' must be a string"
            ))),
            None => Err(GatewayError::missing_params([key])),
        }
    }

    /// Returns a clone of a required value.
    pub fn value(&self, key: &str) -> Result<Value, GatewayError> {
        self.get(key)
            .cloned()
            .ok_or_else(|| GatewayError::missing_params([key]))
    }

    /// Returns a clone of an optional value.
    #[must_use]
    pub fn optional(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the parameters as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
