//! Runtime values read from and written to record attributes.

use rkyv::{Archive, Deserialize, Serialize};

use crate::error::Error;
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// Identifier of one record within a record type.
pub type RecordId = u64;

/// A runtime attribute value.
///
/// Stored and computed attributes produce the same `Value`s, so callers
/// cannot tell which kind they read from.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub enum Value {
    /// No value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string. Workflow states are strings.
    String(String),
    /// Binary data (images, QR codes, attachments).
    Bytes(Vec<u8>),
    /// Timestamp as microseconds since Unix epoch.
    Timestamp(i64),
    /// Identifiers of related records.
    Ids(Vec<RecordId>),
    /// List of strings.
    Strings(Vec<String>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value holds a list.
    pub fn is_list(&self) -> bool {
        matches!(self, Value::Ids(_) | Value::Strings(_))
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64. Integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bytes reference.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get as related record ids.
    pub fn as_ids(&self) -> Option<&[RecordId]> {
        match self {
            Value::Ids(ids) => Some(ids),
            _ => None,
        }
    }

    /// Split a list value into its elements.
    ///
    /// Scalars come back as a single-element list; null as an empty one.
    /// Ids above `i64::MAX` cannot be represented as elements and fail.
    pub fn into_elements(self) -> Result<Vec<Value>, Error> {
        match self {
            Value::Null => Ok(Vec::new()),
            Value::Ids(ids) => ids
                .into_iter()
                .map(|id| {
                    i64::try_from(id)
                        .map(Value::Int)
                        .map_err(|_| Error::IdOutOfRange(id))
                })
                .collect(),
            Value::Strings(items) => Ok(items.into_iter().map(Value::String).collect()),
            other => Ok(vec![other]),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Vec<RecordId>> for Value {
    fn from(v: Vec<RecordId>) -> Self {
        Value::Ids(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Strings(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
