//! Property types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Declared type of a business-object property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropType {
    /// Boolean.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Timestamp (microseconds since Unix epoch).
    Timestamp,
    /// UUID, used for ids and foreign keys.
    Uuid,
}

impl PropType {
    /// Whether a value can be stored in a property of this type.
    ///
    /// Null is accepted by every type; compulsory checks happen on save.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (PropType::Bool, Value::Bool(_))
                | (PropType::Int32, Value::Int32(_))
                | (PropType::Int64, Value::Int64(_) | Value::Int32(_))
                | (PropType::Float64, Value::Float64(_))
                | (PropType::String, Value::String(_))
                | (PropType::Timestamp, Value::Timestamp(_))
                | (PropType::Uuid, Value::Uuid(_))
        )
    }
}

impl fmt::Display for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropType::Bool => "bool",
            PropType::Int32 => "int32",
            PropType::Int64 => "int64",
            PropType::Float64 => "float64",
            PropType::String => "string",
            PropType::Timestamp => "timestamp",
            PropType::Uuid => "uuid",
        };
        f.write_str(name)
    }
}
