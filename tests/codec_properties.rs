use chrono::{DateTime, Utc};
use colmapper::codec::key::{decode_row_key, encode_row_key};
use colmapper::codec::{decode, encode};
use colmapper::{SemanticType, Value};
use proptest::prelude::*;
use uuid::Uuid;

fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (-100_000_000_000i64..100_000_000_000i64, 0u32..1_000_000_000u32)
        .prop_map(|(secs, nanos)| DateTime::from_timestamp(secs, nanos).unwrap())
}

fn roundtrips(value: Value, ty: SemanticType) -> Result<(), TestCaseError> {
    let bytes = encode(&value, &ty).unwrap();
    prop_assert_eq!(decode(&bytes, &ty).unwrap(), value);
    Ok(())
}

fn encoded(value: Value, ty: &SemanticType) -> Vec<u8> {
    encode(&value, ty).unwrap()
}

proptest! {
    #[test]
    fn integer_roundtrip(i in any::<i64>()) {
        roundtrips(Value::Integer(i), SemanticType::Integer)?;
    }

    #[test]
    fn float_roundtrip(f in -1e300f64..1e300f64) {
        roundtrips(Value::Float(f), SemanticType::Float)?;
    }

    #[test]
    fn text_roundtrip(s in ".*") {
        roundtrips(Value::Text(s), SemanticType::Text)?;
    }

    #[test]
    fn blob_and_uuid_roundtrip(bytes in proptest::collection::vec(any::<u8>(), 0..64), id in any::<u128>()) {
        roundtrips(Value::Blob(bytes), SemanticType::Blob)?;
        roundtrips(Value::Uuid(Uuid::from_u128(id)), SemanticType::Uuid)?;
    }

    #[test]
    fn timestamp_roundtrip(ts in timestamp()) {
        roundtrips(Value::Timestamp(ts), SemanticType::Timestamp)?;
    }

    #[test]
    fn key_list_roundtrip(keys in proptest::collection::vec("[a-z0-9]{0,12}", 0..8)) {
        roundtrips(Value::KeyList(keys), SemanticType::KeyList)?;
    }

    /// Byte order of encoded integers equals numeric order.
    #[test]
    fn integer_order_preserved(a in any::<i64>(), b in any::<i64>()) {
        let ty = SemanticType::Integer;
        prop_assert_eq!(
            encoded(Value::Integer(a), &ty).cmp(&encoded(Value::Integer(b), &ty)),
            a.cmp(&b)
        );
    }

    #[test]
    fn float_order_preserved(a in -1e300f64..1e300f64, b in -1e300f64..1e300f64) {
        let ty = SemanticType::Float;
        if a < b {
            prop_assert!(encoded(Value::Float(a), &ty) < encoded(Value::Float(b), &ty));
        } else if a > b {
            prop_assert!(encoded(Value::Float(a), &ty) > encoded(Value::Float(b), &ty));
        }
    }

    #[test]
    fn text_order_preserved(a in ".{0,16}", b in ".{0,16}") {
        let ty = SemanticType::Text;
        prop_assert_eq!(
            encoded(Value::Text(a.clone()), &ty).cmp(&encoded(Value::Text(b.clone()), &ty)),
            a.cmp(&b)
        );
    }

    #[test]
    fn timestamp_order_preserved(a in timestamp(), b in timestamp()) {
        let ty = SemanticType::Timestamp;
        prop_assert_eq!(
            encoded(Value::Timestamp(a), &ty).cmp(&encoded(Value::Timestamp(b), &ty)),
            a.cmp(&b)
        );
    }

    /// Integer row keys sort like the keys they encode, so key ranges scan in value order.
    #[test]
    fn integer_row_key_order_preserved(a in any::<i64>(), b in any::<i64>()) {
        let ty = SemanticType::Integer;
        let ka = encode_row_key(&Value::Integer(a), &ty).unwrap();
        let kb = encode_row_key(&Value::Integer(b), &ty).unwrap();
        prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
        prop_assert_eq!(decode_row_key(&ka, &ty).unwrap(), Value::Integer(a));
    }

    #[test]
    fn uuid_and_timestamp_row_keys_roundtrip(id in any::<u128>(), ts in timestamp()) {
        let uuid_key = encode_row_key(&Value::Uuid(Uuid::from_u128(id)), &SemanticType::Uuid).unwrap();
        prop_assert_eq!(
            decode_row_key(&uuid_key, &SemanticType::Uuid).unwrap(),
            Value::Uuid(Uuid::from_u128(id))
        );

        let ts_key = encode_row_key(&Value::Timestamp(ts), &SemanticType::Timestamp).unwrap();
        prop_assert_eq!(
            decode_row_key(&ts_key, &SemanticType::Timestamp).unwrap(),
            Value::Timestamp(ts)
        );
    }
}
