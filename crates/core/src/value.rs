//! Schemaless stored values
//!
//! `Value` is a newtype around `serde_json::Value` providing:
//! - Direct access to the underlying value via Deref
//! - Easy construction from common types
//! - Serialization support (JSON on the wire, MessagePack in the log)
//!
//! The `(scope, key)` pair is the only type discriminant application code
//! gets; the fabric never inspects the payload.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// Structured value stored under a memory key.
///
/// # Examples
///
/// ```
/// use fabric_core::Value;
///
/// let s = Value::from("dark");
/// let n = Value::from(42i64);
/// let obj: Value = r#"{"theme": "dark"}"#.parse().unwrap();
///
/// assert_eq!(s.as_str(), Some("dark"));
/// assert_eq!(n.as_i64(), Some(42));
/// assert!(obj.is_object());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(serde_json::Value);

impl Value {
    /// Create a null value
    pub fn null() -> Self {
        Value(serde_json::Value::Null)
    }

    /// Create from a serde_json::Value
    pub fn from_json(value: serde_json::Value) -> Self {
        Value(value)
    }

    /// Get the underlying serde_json::Value
    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }

    /// Get a reference to the underlying serde_json::Value
    pub fn as_inner(&self) -> &serde_json::Value {
        &self.0
    }

    /// Serialize to compact JSON string
    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }

    /// Approximate encoded size in bytes
    ///
    /// Estimate based on the JSON representation.
    pub fn size_bytes(&self) -> usize {
        self.to_json_string().len()
    }
}

impl FromStr for Value {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map(Value)
    }
}

impl Deref for Value {
    type Target = serde_json::Value;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::null()
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value(v)
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        v.0
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value(serde_json::Value::Bool(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value(serde_json::Value::Number(v.into()))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value(serde_json::Value::Number(v.into()))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value(serde_json::json!(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value(serde_json::Value::String(v.to_string()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value(serde_json::Value::String(v))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value(serde_json::Value::Array(
            v.into_iter().map(|item| item.into().0).collect(),
        ))
    }
}
