//! The generic decoded value tree consumed by the decoder.
//!
//! Payloads arrive as dynamically shaped data (parsed JSON or an
//! equivalent self-describing form). Rather than leaning on `serde_json`
//! types throughout, the decoder works against this tagged variant, which
//! keeps the float/double distinction that JSON numbers lose.

use std::collections::BTreeMap;

use base64::Engine as _;

use crate::error::{Error, Result};

/// A dynamically shaped value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Short name of the variant, used in mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub(crate) fn string_like(&self, expected: &str) -> Result<String> {
        match self {
            Value::String(s) => Ok(s.clone()),
            other => Err(Error::mismatch(expected, other.kind_name())),
        }
    }

    pub(crate) fn bool_like(&self, expected: &str) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(Error::mismatch(expected, other.kind_name())),
        }
    }

    /// An integer-like value: a native integer, or a double holding an
    /// integral value (the shape JSON parsers produce for whole numbers).
    pub(crate) fn int_like(&self, expected: &str) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Double(d) if d.fract() == 0.0 => Ok(*d as i64),
            other => Err(Error::mismatch(expected, other.kind_name())),
        }
    }

    /// A bytes-like value: raw bytes, or a base64 string.
    pub(crate) fn bytes_like(&self, expected: &str) -> Result<Vec<u8>> {
        match self {
            Value::Bytes(b) => Ok(b.clone()),
            Value::String(s) => base64::engine::general_purpose::STANDARD
                .decode(s)
                .map_err(|_| Error::mismatch(expected, "non-base64 string")),
            other => Err(Error::mismatch(expected, other.kind_name())),
        }
    }

    pub(crate) fn array_like(&self, expected: &str) -> Result<&[Value]> {
        match self {
            Value::Array(elements) => Ok(elements),
            other => Err(Error::mismatch(expected, other.kind_name())),
        }
    }

    pub(crate) fn object_like(&self, expected: &str) -> Result<&BTreeMap<String, Value>> {
        match self {
            Value::Object(entries) => Ok(entries),
            other => Err(Error::mismatch(expected, other.kind_name())),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Int(u as i64)
                } else {
                    Value::Double(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(elements) => {
                Value::Array(elements.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}
