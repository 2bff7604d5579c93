use super::{DbError, Result, Value};
use std::fmt;

/// Declared type of an entity attribute.
///
/// The codec owns one byte layout per variant. `Unsupported` lets a
/// descriptor name a type the codec cannot handle; metadata resolution
/// rejects it so the error surfaces before any row is encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
    Blob,
    Uuid,
    /// Ordered row keys of related entities.
    KeyList,
    Unsupported(String),
}

impl SemanticType {
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    /// Whether values of this type can serve as a row key.
    pub fn is_keyable(&self) -> bool {
        matches!(self, Self::Integer | Self::Text | Self::Uuid | Self::Timestamp)
    }

    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Float, Value::Float(_)) => true,
            (Self::Float, Value::Integer(_)) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Timestamp, Value::Timestamp(_)) => true,
            (Self::Blob, Value::Blob(_)) => true,
            (Self::Uuid, Value::Uuid(_)) => true,
            (Self::KeyList, Value::KeyList(_)) => true,
            _ => false,
        }
    }

    /// Coerces a literal into this type.
    ///
    /// Query operands arrive loosely typed (a timestamp written as an RFC 3339
    /// string, an integer compared against a float column); predicates and
    /// index lookups must see the exact variant the codec writes.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (Self::Float, Value::Integer(i)) => Ok(Value::Float(i as f64)),
            (Self::Timestamp, Value::Text(s)) => chrono::DateTime::parse_from_rfc3339(&s)
                .map(|ts| Value::Timestamp(ts.with_timezone(&chrono::Utc)))
                .map_err(|e| DbError::TypeMismatch(format!("'{}' is not a timestamp: {}", s, e))),
            (Self::Uuid, Value::Text(s)) => uuid::Uuid::parse_str(&s)
                .map(Value::Uuid)
                .map_err(|e| DbError::TypeMismatch(format!("'{}' is not a UUID: {}", s, e))),
            (Self::KeyList, Value::Text(s)) => Ok(Value::KeyList(vec![s])),
            (ty, value) if ty.is_compatible(&value) => Ok(value),
            (ty, value) => Err(DbError::TypeMismatch(format!(
                "Expected {}, got {}",
                ty,
                value.type_name()
            ))),
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Float => write!(f, "FLOAT"),
            Self::Text => write!(f, "TEXT"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::Blob => write!(f, "BLOB"),
            Self::Uuid => write!(f, "UUID"),
            Self::KeyList => write!(f, "KEYLIST"),
            Self::Unsupported(name) => write!(f, "{}", name),
        }
    }
}
