use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::core::{DbError, Result};

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Blob(Vec<u8>),
    Uuid(Uuid),
    KeyList(Vec<String>),
}

impl Value {
    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        match (self, other) {
            // ========================================
            // NULL handling: NULL is "greater" than all values (NULL LAST)
            // ========================================
            (Value::Null, Value::Null) => Ok(Ordering::Equal),
            (Value::Null, _) => Ok(Ordering::Greater),
            (_, Value::Null) => Ok(Ordering::Less),

            // ========================================
            // Same type comparisons
            // ========================================
            (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),

            (Value::Float(a), Value::Float(b)) => Ok(compare_floats(*a, *b)),

            (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),

            (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),

            (Value::Timestamp(a), Value::Timestamp(b)) => Ok(a.cmp(b)),

            (Value::Blob(a), Value::Blob(b)) => Ok(a.cmp(b)),

            (Value::Uuid(a), Value::Uuid(b)) => Ok(a.cmp(b)),

            (Value::KeyList(a), Value::KeyList(b)) => Ok(a.cmp(b)),

            // ========================================
            // Mixed numeric types (implicit coercion)
            // ========================================
            (Value::Integer(a), Value::Float(b)) => Ok(compare_floats(*a as f64, *b)),

            (Value::Float(a), Value::Integer(b)) => Ok(compare_floats(*a, *b as f64)),

            // ========================================
            // Type mismatches - ERROR
            // ========================================
            _ => Err(DbError::TypeMismatch(format!(
                "Cannot compare incompatible types: {} and {}",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
            Self::Timestamp(_) => "TIMESTAMP",
            Self::Blob(_) => "BLOB",
            Self::Uuid(_) => "UUID",
            Self::KeyList(_) => "KEYLIST",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

// NaN sorts after every other float and equals itself.
fn compare_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

// -0.0 equals 0.0 and every NaN equals every other NaN.
fn numeric_hash_bits(f: f64) -> u64 {
    if f == 0.0 {
        0.0f64.to_bits()
    } else if f.is_nan() {
        f64::NAN.to_bits()
    } else {
        f.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                a == b
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Blob(a), Self::Blob(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::KeyList(a), Self::KeyList(b)) => a == b,
            (Self::Integer(i), Self::Float(f)) | (Self::Float(f), Self::Integer(i)) => {
                *i as f64 == *f
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => 0u8.hash(state),
            // Integers and floats compare equal across types, so both hash
            // through the same normalized f64.
            Self::Integer(i) => {
                1u8.hash(state);
                numeric_hash_bits(*i as f64).hash(state);
            }
            Self::Float(f) => {
                1u8.hash(state);
                numeric_hash_bits(*f).hash(state);
            }
            Self::Text(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Self::Boolean(b) => {
                4u8.hash(state);
                b.hash(state);
            }
            Self::Timestamp(ts) => {
                5u8.hash(state);
                ts.hash(state);
            }
            Self::Blob(bytes) => {
                6u8.hash(state);
                bytes.hash(state);
            }
            Self::Uuid(id) => {
                7u8.hash(state);
                id.hash(state);
            }
            Self::KeyList(keys) => {
                8u8.hash(state);
                keys.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => {
                if fl.is_nan() {
                    write!(f, "NaN")
                } else if fl.is_infinite() {
                    if *fl > 0.0 {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else {
                    write!(f, "{}", fl)
                }
            }
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Self::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Self::Uuid(id) => write!(f, "{}", id),
            Self::KeyList(keys) => write!(f, "[{}]", keys.join(", ")),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Blob(bytes)
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Self::Uuid(id)
    }
}
