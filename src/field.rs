use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// A caller-supplied key/value pair, written under the record's `context`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    key: String,
    value: Value,
}

impl Field {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, Value::String(value.into()))
    }

    pub fn int(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, Value::from(value))
    }

    pub fn uint(key: impl Into<String>, value: u64) -> Self {
        Self::new(key, Value::from(value))
    }

    /// Non-finite values are written as `null`.
    pub fn float(key: impl Into<String>, value: f64) -> Self {
        Self::new(key, Value::from(value))
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, Value::Bool(value))
    }

    pub fn display(key: impl Into<String>, value: &impl fmt::Display) -> Self {
        Self::new(key, Value::String(value.to_string()))
    }

    /// `error` field holding the error's message.
    pub fn error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::display("error", &err)
    }

    /// Any serializable value, kept as structured JSON.
    ///
    /// A value that fails to serialize never fails the log call: the field
    /// is renamed to `<key>Error` and carries the serializer's message.
    pub fn any<T: Serialize + ?Sized>(key: impl Into<String>, value: &T) -> Self {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => Self { key, value },
            Err(e) => Self {
                key: format!("{key}Error"),
                value: Value::String(e.to_string()),
            },
        }
    }

    fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn into_pair(self) -> (String, Value) {
        (self.key, self.value)
    }
}
