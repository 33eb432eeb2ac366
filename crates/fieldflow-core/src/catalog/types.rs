//! Attribute value types.

use fieldflow_proto::Value;
use serde::{Deserialize, Serialize};

/// Semantic type of an attribute's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    /// Boolean.
    Boolean,
    /// 64-bit integer.
    Integer,
    /// Floating point.
    Float,
    /// Fixed-precision number.
    Numeric {
        /// Total number of digits.
        digits: u8,
        /// Digits after the decimal point.
        scale: u8,
    },
    /// Single-line string.
    Char,
    /// Multi-line string.
    Text,
    /// Binary data.
    Binary,
    /// Timestamp.
    DateTime,
    /// One value out of a fixed set of strings.
    Selection {
        /// Allowed values.
        options: Vec<String>,
    },
    /// Reference to one record of another type.
    #[serde(rename = "many2one")]
    Many2One {
        /// Target record type.
        target: String,
    },
    /// References to many records of another type.
    #[serde(rename = "many2many")]
    Many2Many {
        /// Target record type.
        target: String,
    },
}

impl FieldType {
    /// Create a selection type.
    pub fn selection<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldType::Selection {
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a many-to-one reference type.
    pub fn many2one(target: impl Into<String>) -> Self {
        FieldType::Many2One {
            target: target.into(),
        }
    }

    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Float | FieldType::Numeric { .. }
        )
    }

    /// Check if this type references other records.
    pub fn is_relational(&self) -> bool {
        matches!(self, FieldType::Many2One { .. } | FieldType::Many2Many { .. })
    }

    /// Check whether `value` is a valid value of this type. Null always is.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (FieldType::Boolean, Value::Bool(_)) => true,
            (FieldType::Integer, Value::Int(_)) => true,
            (FieldType::Float | FieldType::Numeric { .. }, Value::Float(_) | Value::Int(_)) => true,
            (FieldType::Char | FieldType::Text, Value::String(_)) => true,
            (FieldType::Binary, Value::Bytes(_)) => true,
            (FieldType::DateTime, Value::Timestamp(_)) => true,
            (FieldType::Selection { options }, Value::String(s)) => options.iter().any(|o| o == s),
            (FieldType::Many2One { .. }, Value::Int(id)) => *id >= 0,
            (FieldType::Many2Many { .. }, Value::Ids(_)) => true,
            _ => false,
        }
    }
}
