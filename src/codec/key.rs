//! Primary-key value <-> row identifier.
//!
//! Row identifiers are strings. Each keyable type renders so that
//! lexicographic key order equals value order, which lets primary-key range
//! predicates run as native range scans.

use super::{decode, decode_i64, encode, encode_i64};
use crate::core::{DbError, Result, SemanticType, Value};

pub fn encode_row_key(value: &Value, semantic_type: &SemanticType) -> Result<String> {
    let value = semantic_type.coerce(value.clone())?;
    match (semantic_type, &value) {
        (_, Value::Null) => Err(DbError::Metadata("Primary key value is NULL".into())),
        (SemanticType::Text, Value::Text(s)) if s.is_empty() => {
            Err(DbError::Metadata("Primary key value is empty".into()))
        }
        (SemanticType::Text, Value::Text(s)) => Ok(s.clone()),
        (SemanticType::Integer, Value::Integer(i)) => Ok(hex::encode(encode_i64(*i))),
        (SemanticType::Uuid, Value::Uuid(id)) => Ok(id.hyphenated().to_string()),
        (SemanticType::Timestamp, Value::Timestamp(_)) => {
            Ok(hex::encode(encode(&value, semantic_type)?))
        }
        (ty, _) => Err(DbError::Metadata(format!("{} cannot be used as a row key", ty))),
    }
}

pub fn decode_row_key(row_id: &str, semantic_type: &SemanticType) -> Result<Value> {
    match semantic_type {
        SemanticType::Text => Ok(Value::Text(row_id.to_string())),
        SemanticType::Integer => {
            let bytes: [u8; 8] = decode_hex(row_id)?
                .try_into()
                .map_err(|_| DbError::Codec(format!("Row key '{}' is not an INTEGER key", row_id)))?;
            Ok(Value::Integer(decode_i64(bytes)))
        }
        SemanticType::Uuid => uuid::Uuid::parse_str(row_id)
            .map(Value::Uuid)
            .map_err(|e| DbError::Codec(format!("Row key '{}' is not a UUID: {}", row_id, e))),
        SemanticType::Timestamp => decode(&decode_hex(row_id)?, semantic_type),
        ty => Err(DbError::Metadata(format!("{} cannot be used as a row key", ty))),
    }
}

/// Hex row key back to bytes, with malformed keys reported as codec errors.
pub fn decode_hex(row_key: &str) -> Result<Vec<u8>> {
    hex::decode(row_key).map_err(|e| DbError::Codec(format!("Invalid hex key '{}': {}", row_key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_text_keys_are_verbatim() {
        let key = encode_row_key(&Value::from("u1"), &SemanticType::Text).unwrap();
        assert_eq!(key, "u1");
        assert_eq!(decode_row_key(&key, &SemanticType::Text).unwrap(), Value::from("u1"));
    }

    #[test]
    fn test_integer_keys_sort_numerically() {
        let keys: Vec<String> = [-5i64, -1, 0, 9, 10, 100]
            .iter()
            .map(|i| encode_row_key(&Value::Integer(*i), &SemanticType::Integer).unwrap())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(
            decode_row_key(&keys[0], &SemanticType::Integer).unwrap(),
            Value::Integer(-5)
        );
    }

    #[test]
    fn test_timestamp_keys_roundtrip() {
        let ts = DateTime::from_timestamp(1_700_000_000, 5).unwrap();
        let key = encode_row_key(&Value::Timestamp(ts), &SemanticType::Timestamp).unwrap();
        assert_eq!(
            decode_row_key(&key, &SemanticType::Timestamp).unwrap(),
            Value::Timestamp(ts)
        );
    }

    #[test]
    fn test_null_and_empty_keys_rejected() {
        assert!(matches!(
            encode_row_key(&Value::Null, &SemanticType::Text),
            Err(DbError::Metadata(_))
        ));
        assert!(matches!(
            encode_row_key(&Value::from(""), &SemanticType::Text),
            Err(DbError::Metadata(_))
        ));
    }

    #[test]
    fn test_hex_rejects_garbage() {
        assert!(matches!(decode_hex("abc"), Err(DbError::Codec(_))));
        assert!(matches!(decode_hex("zz"), Err(DbError::Codec(_))));
        assert_eq!(decode_hex("00ff").unwrap(), vec![0, 255]);
        assert!(matches!(
            decode_row_key("not-hex", &SemanticType::Integer),
            Err(DbError::Codec(_))
        ));
    }
}
