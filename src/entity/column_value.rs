use super::ColumnValue;
use crate::core::{DbError, Result, SemanticType, Value};
use chrono::{DateTime, Utc};
use uuid::Uuid;

fn mismatch<T>(expected: SemanticType, value: &Value) -> Result<T> {
    Err(DbError::TypeMismatch(format!(
        "Expected {}, got {}",
        expected,
        value.type_name()
    )))
}

// A column absent from a partially loaded row leaves the field at its
// default, so NULL decodes to the default rather than failing.
macro_rules! impl_column_value {
    ($ty:ty, $semantic:ident, $variant:ident) => {
        impl ColumnValue for $ty {
            fn semantic_type() -> SemanticType {
                SemanticType::$semantic
            }

            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    Value::Null => Ok(<$ty>::default()),
                    other => mismatch(SemanticType::$semantic, &other),
                }
            }
        }
    };
}

impl_column_value!(i64, Integer, Integer);
impl_column_value!(String, Text, Text);
impl_column_value!(bool, Boolean, Boolean);
impl_column_value!(DateTime<Utc>, Timestamp, Timestamp);
impl_column_value!(Vec<u8>, Blob, Blob);
impl_column_value!(Uuid, Uuid, Uuid);
impl_column_value!(Vec<String>, KeyList, KeyList);

impl ColumnValue for i32 {
    fn semantic_type() -> SemanticType {
        SemanticType::Integer
    }

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => i32::try_from(i)
                .map_err(|_| DbError::TypeMismatch(format!("{} does not fit in i32", i))),
            Value::Null => Ok(0),
            other => mismatch(SemanticType::Integer, &other),
        }
    }
}

impl ColumnValue for f64 {
    fn semantic_type() -> SemanticType {
        SemanticType::Float
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            Value::Null => Ok(0.0),
            other => mismatch(SemanticType::Float, &other),
        }
    }
}

impl<T: ColumnValue> ColumnValue for Option<T> {
    fn semantic_type() -> SemanticType {
        T::semantic_type()
    }

    fn to_value(&self) -> Value {
        match self {
            Some(value) => value.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_maps_null() {
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Some(5i64).to_value(), Value::Integer(5));
        assert_eq!(None::<String>.to_value(), Value::Null);
    }

    #[test]
    fn test_null_yields_default() {
        assert_eq!(String::from_value(Value::Null).unwrap(), "");
        assert_eq!(i64::from_value(Value::Null).unwrap(), 0);
    }

    #[test]
    fn test_wrong_variant_is_mismatch() {
        assert!(matches!(
            i64::from_value(Value::Text("1".into())),
            Err(DbError::TypeMismatch(_))
        ));
        assert!(i32::from_value(Value::Integer(i64::MAX)).is_err());
    }
}
