//! Attribute value <-> column byte encoding.
//!
//! Every layout compares correctly as unsigned bytes wherever the type has a
//! meaningful order, so encoded values double as index keys and range bounds.

pub mod key;

use crate::core::{DbError, Result, SemanticType, Value};
use chrono::{DateTime, Utc};
use uuid::Uuid;

const SIGN_BIT: u64 = 1 << 63;

pub fn encode(value: &Value, semantic_type: &SemanticType) -> Result<Vec<u8>> {
    match (semantic_type, value) {
        (_, Value::Null) => Err(DbError::Codec(
            "NULL has no column encoding; it is written as a column removal".into(),
        )),
        (SemanticType::Integer, Value::Integer(i)) => Ok(encode_i64(*i).to_vec()),
        (SemanticType::Float, Value::Float(f)) => Ok(encode_f64(*f).to_vec()),
        (SemanticType::Float, Value::Integer(i)) => Ok(encode_f64(*i as f64).to_vec()),
        (SemanticType::Text, Value::Text(s)) => Ok(s.as_bytes().to_vec()),
        (SemanticType::Boolean, Value::Boolean(b)) => Ok(vec![u8::from(*b)]),
        (SemanticType::Timestamp, Value::Timestamp(ts)) => Ok(encode_timestamp(ts)),
        (SemanticType::Blob, Value::Blob(bytes)) => Ok(bytes.clone()),
        (SemanticType::Uuid, Value::Uuid(id)) => Ok(id.as_bytes().to_vec()),
        (SemanticType::KeyList, Value::KeyList(keys)) => Ok(encode_key_list(keys)),
        (SemanticType::Unsupported(name), _) => Err(DbError::UnsupportedType(name.clone())),
        (ty, value) => Err(DbError::TypeMismatch(format!(
            "Cannot encode {} as {}",
            value.type_name(),
            ty
        ))),
    }
}

pub fn decode(bytes: &[u8], semantic_type: &SemanticType) -> Result<Value> {
    match semantic_type {
        SemanticType::Integer => Ok(Value::Integer(decode_i64(fixed::<8>(bytes, "INTEGER")?))),
        SemanticType::Float => Ok(Value::Float(decode_f64(fixed::<8>(bytes, "FLOAT")?))),
        SemanticType::Text => String::from_utf8(bytes.to_vec())
            .map(Value::Text)
            .map_err(|e| DbError::Codec(format!("TEXT column is not UTF-8: {}", e))),
        SemanticType::Boolean => match bytes {
            [0] => Ok(Value::Boolean(false)),
            [1] => Ok(Value::Boolean(true)),
            _ => Err(DbError::Codec(format!("Invalid BOOLEAN encoding: {:?}", bytes))),
        },
        SemanticType::Timestamp => decode_timestamp(bytes).map(Value::Timestamp),
        SemanticType::Blob => Ok(Value::Blob(bytes.to_vec())),
        SemanticType::Uuid => Ok(Value::Uuid(Uuid::from_bytes(fixed::<16>(bytes, "UUID")?))),
        SemanticType::KeyList => decode_key_list(bytes).map(Value::KeyList),
        SemanticType::Unsupported(name) => Err(DbError::UnsupportedType(name.clone())),
    }
}

fn fixed<const N: usize>(bytes: &[u8], type_name: &str) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        DbError::Codec(format!(
            "{} column must be {} bytes, got {}",
            type_name,
            N,
            bytes.len()
        ))
    })
}

pub(crate) fn encode_i64(value: i64) -> [u8; 8] {
    ((value as u64) ^ SIGN_BIT).to_be_bytes()
}

pub(crate) fn decode_i64(bytes: [u8; 8]) -> i64 {
    (u64::from_be_bytes(bytes) ^ SIGN_BIT) as i64
}

fn encode_f64(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let ordered = if bits & SIGN_BIT == 0 { bits ^ SIGN_BIT } else { !bits };
    ordered.to_be_bytes()
}

fn decode_f64(bytes: [u8; 8]) -> f64 {
    let ordered = u64::from_be_bytes(bytes);
    let bits = if ordered & SIGN_BIT != 0 { ordered ^ SIGN_BIT } else { !ordered };
    f64::from_bits(bits)
}

fn encode_timestamp(ts: &DateTime<Utc>) -> Vec<u8> {
    let mut out = Vec::with_capacity(12);
    out.extend_from_slice(&encode_i64(ts.timestamp()));
    out.extend_from_slice(&ts.timestamp_subsec_nanos().to_be_bytes());
    out
}

fn decode_timestamp(bytes: &[u8]) -> Result<DateTime<Utc>> {
    let raw = fixed::<12>(bytes, "TIMESTAMP")?;
    let (secs, nanos) = raw.split_at(8);
    let secs = decode_i64(fixed::<8>(secs, "TIMESTAMP")?);
    let nanos = u32::from_be_bytes(fixed::<4>(nanos, "TIMESTAMP")?);
    DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| DbError::Codec(format!("Timestamp out of range: {}s {}ns", secs, nanos)))
}

fn encode_key_list(keys: &[String]) -> Vec<u8> {
    let mut out = Vec::with_capacity(keys.iter().map(|k| k.len() + 4).sum());
    for key in keys {
        out.extend_from_slice(&(key.len() as u32).to_be_bytes());
        out.extend_from_slice(key.as_bytes());
    }
    out
}

fn decode_key_list(mut bytes: &[u8]) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    while !bytes.is_empty() {
        if bytes.len() < 4 {
            return Err(DbError::Codec("Truncated KEYLIST length prefix".into()));
        }
        let (len, rest) = bytes.split_at(4);
        let len = u32::from_be_bytes(fixed::<4>(len, "KEYLIST")?) as usize;
        if rest.len() < len {
            return Err(DbError::Codec(format!(
                "KEYLIST entry claims {} bytes, {} remain",
                len,
                rest.len()
            )));
        }
        let (key, rest) = rest.split_at(len);
        let key = std::str::from_utf8(key)
            .map_err(|e| DbError::Codec(format!("KEYLIST entry is not UTF-8: {}", e)))?;
        keys.push(key.to_string());
        bytes = rest;
    }
    Ok(keys)
}
