//! End-to-end properties: round-trips, canonical determinism, constraint
//! enforcement and decoder robustness.

use don::codec::{decode, decode_dynamic, encode, encode_dynamic};
use don::model::schema::EnumType;
use don::util::datetime::MICROS_PER_DAY;
use don::util::{parse_date, parse_datetime, parse_duration, parse_time};
use don::{
    canonicalize, content_hash, from_json_str, to_json, to_json_string, validate, BigInt, Constraints, Decimal,
    EncodeOptions, Field, Frame, FrameColumn, IntWidth, JsonError, Object, Schema, SortOrder, TypeDescriptor,
    ValidateOptions, ValidationErrorKind, Value,
};
use proptest::prelude::*;
use serde_json::json;
use uuid::Uuid;

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i8>().prop_map(Value::Int8),
        any::<i16>().prop_map(Value::Int16),
        any::<i32>().prop_map(Value::Int32),
        any::<i64>().prop_map(Value::Int64),
        any::<i64>().prop_map(|v| Value::BigInt(BigInt::from_i64(v))),
        "-?[1-9][0-9]{19,40}".prop_map(|s| Value::BigInt(s.parse().unwrap())),
        (any::<i64>(), -40i32..40).prop_map(|(m, e)| Value::Decimal(Decimal::new(BigInt::from_i64(m), e))),
        (-1.0e6f32..1.0e6f32).prop_map(Value::Float32),
        (-1.0e12f64..1.0e12f64).prop_map(Value::Float64),
        "\\PC{0,16}".prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..24).prop_map(Value::Bytes),
        any::<[u8; 16]>().prop_map(|b| Value::Uuid(Uuid::from_bytes(b))),
        any::<i32>().prop_map(Value::Date),
        (0..MICROS_PER_DAY).prop_map(Value::Time),
        any::<i64>().prop_map(Value::DateTime),
        any::<i64>().prop_map(Value::Duration),
        any::<i64>().prop_map(Value::Enum),
    ]
}

fn any_value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

fn ledger_schema() -> Schema {
    Schema::new(TypeDescriptor::frame(vec![
        Field::new("id", TypeDescriptor::Int64)
            .with_constraints(Constraints::new().unique().sorted(SortOrder::Asc)),
        Field::new("label", TypeDescriptor::String).nullable(),
        Field::new("amount", TypeDescriptor::Decimal).nullable(),
    ]))
    .unwrap()
}

fn ledger(rows: &[(i64, Option<String>, Option<Decimal>)]) -> Value {
    let ids = rows.iter().map(|r| Value::Int64(r.0)).collect();
    let labels = rows.iter().map(|r| r.1.clone().map(Value::String).unwrap_or(Value::Null)).collect();
    let amounts = rows.iter().map(|r| r.2.clone().map(Value::Decimal).unwrap_or(Value::Null)).collect();
    Value::Frame(
        Frame::new(
            rows.len(),
            vec![
                FrameColumn::new("id", ids),
                FrameColumn::new("label", labels),
                FrameColumn::new("amount", amounts),
            ],
        )
        .unwrap(),
    )
}

fn ledger_rows() -> impl Strategy<Value = Vec<(i64, Option<String>, Option<Decimal>)>> {
    prop::collection::hash_set(any::<i64>(), 0..24)
        .prop_flat_map(|ids| {
            let n = ids.len();
            (
                Just(ids.into_iter().collect::<Vec<_>>()),
                prop::collection::vec(prop::option::of("[a-z ]{0,8}"), n),
                prop::collection::vec(
                    prop::option::of((any::<i32>(), -6i32..6).prop_map(|(m, e)| Decimal::new(BigInt::from_i64(m as i64), e))),
                    n,
                ),
            )
        })
        .prop_map(|(ids, labels, amounts)| {
            ids.into_iter()
                .zip(labels)
                .zip(amounts)
                .map(|((id, label), amount)| (id, label, amount))
                .collect()
        })
}

/// Text shaped like temporal values, with multi-byte characters and long
/// digit runs mixed in.
fn temporal_like() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[0-9]{1,4}",
            "[0-9]{10,24}",
            Just("-".to_string()),
            Just(":".to_string()),
            Just("+".to_string()),
            Just(".".to_string()),
            Just("T".to_string()),
            Just("Z".to_string()),
            Just("P".to_string()),
            Just("D".to_string()),
            Just("H".to_string()),
            Just("S".to_string()),
            "[é€日\u{1F600}]",
        ],
        0..12,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn test_temporal_text_never_panics(text in prop_oneof![temporal_like(), "\\PC{0,24}"]) {
        let _ = parse_date(&text);
        let _ = parse_time(&text);
        let _ = parse_datetime(&text);
        let _ = parse_duration(&text);

        let quoted = serde_json::to_string(&text).unwrap();
        for ty in [TypeDescriptor::Date, TypeDescriptor::Time, TypeDescriptor::DateTime, TypeDescriptor::Duration] {
            match from_json_str(&quoted, &Schema::new(ty).unwrap()) {
                Ok(_) | Err(JsonError::InvalidText { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }

    #[test]
    fn test_dynamic_roundtrip(value in any_value()) {
        let bytes = encode_dynamic(&value, EncodeOptions::new()).unwrap();
        prop_assert_eq!(decode_dynamic(&bytes).unwrap(), value);
    }

    #[test]
    fn test_every_truncation_fails(value in any_value()) {
        let bytes = encode_dynamic(&value, EncodeOptions::deterministic()).unwrap();
        for len in 0..bytes.len() {
            let err = decode_dynamic(&bytes[..len]).unwrap_err();
            prop_assert!(err.offset() <= len);
        }
    }

    #[test]
    fn test_frame_roundtrip(rows in ledger_rows()) {
        let schema = ledger_schema();
        let value = ledger(&rows);
        let bytes = encode(&value, &schema, EncodeOptions::new()).unwrap();
        prop_assert_eq!(decode(&bytes, &schema).unwrap(), value.clone());

        let json = to_json_string(&value, &schema).unwrap();
        prop_assert_eq!(from_json_str(&json, &schema).unwrap(), value);
    }

    #[test]
    fn test_canonical_ignores_row_order(rows in ledger_rows().prop_shuffle()) {
        let schema = ledger_schema();
        let mut ordered = rows.clone();
        ordered.sort_by_key(|r| r.0);
        prop_assert_eq!(
            canonicalize(&ledger(&rows), &schema).unwrap(),
            canonicalize(&ledger(&ordered), &schema).unwrap()
        );
    }

    #[test]
    fn test_canonical_ignores_key_order(keys in prop::collection::hash_set("[a-z]{1,8}", 0..10)) {
        let fields: Vec<Field> = keys.iter().map(|k| Field::new(k.as_str(), TypeDescriptor::String)).collect();
        let schema = Schema::new(TypeDescriptor::object(fields)).unwrap();
        let forward: Object = keys.iter().map(|k| (k.clone(), Value::from(k.as_str()))).collect();
        let backward: Object = keys.iter().collect::<Vec<_>>().into_iter().rev().map(|k| (k.clone(), Value::from(k.as_str()))).collect();
        prop_assert_eq!(
            content_hash(&Value::Object(forward), &schema).unwrap(),
            content_hash(&Value::Object(backward), &schema).unwrap()
        );
    }

    #[test]
    fn test_int64_json_roundtrip(v in any::<i64>()) {
        let schema = Schema::new(TypeDescriptor::Int64).unwrap();
        let json = to_json_string(&Value::Int64(v), &schema).unwrap();
        prop_assert_eq!(from_json_str(&json, &schema).unwrap(), Value::Int64(v));
    }
}

#[test]
fn test_nested_json_roundtrip() {
    let status = EnumType::new("Status", IntWidth::I8)
        .variant("open", 0)
        .variant("closed", 1);
    let schema = Schema::new(TypeDescriptor::array(TypeDescriptor::object(vec![
        Field::new("total", TypeDescriptor::BigInt),
        Field::new("rate", TypeDescriptor::Decimal),
        Field::new("status", TypeDescriptor::Enum(status)),
        Field::new("ledger", ledger_schema().root().clone()),
    ])))
    .unwrap();

    let total: BigInt = "18446744073709551617".parse().unwrap();
    let rate: Decimal = "12345678901234567890.0001".parse().unwrap();
    let entry = Object::new()
        .with("total", total)
        .with("rate", rate)
        .with("status", Value::Enum(1))
        .with(
            "ledger",
            ledger(&[
                (1, Some("a".to_string()), None),
                (2, None, Some(Decimal::new(BigInt::from_i64(-5), -1))),
            ]),
        );
    let value = Value::Array(vec![Value::Object(entry)]);

    let json = to_json(&value, &schema).unwrap();
    assert_eq!(json[0]["total"], json!("18446744073709551617"));
    assert_eq!(json[0]["rate"], json!("12345678901234567890.0001"));
    assert_eq!(json[0]["status"], json!("closed"));
    assert_eq!(json[0]["ledger"]["$frame"], json!(true));
    assert_eq!(json[0]["ledger"]["data"]["amount"], json!([null, "-0.5"]));

    let text = serde_json::to_string(&json).unwrap();
    assert_eq!(from_json_str(&text, &schema).unwrap(), value);

    let bytes = encode(&value, &schema, EncodeOptions::new()).unwrap();
    assert_eq!(decode(&bytes, &schema).unwrap(), value);
}

#[test]
fn test_constraint_enforcement() {
    let schema = Schema::new(TypeDescriptor::object(vec![
        Field::new("pct", TypeDescriptor::Int32).with_constraints(Constraints::new().min(0).max(100)),
        Field::new("day", TypeDescriptor::String)
            .with_constraints(Constraints::new().pattern(r"\d{4}-\d{2}-\d{2}")),
    ]))
    .unwrap();
    let check = |pct: i32, day: &str| {
        let value = Value::Object(Object::new().with("pct", pct).with("day", day));
        validate(&value, &schema, &ValidateOptions::collect_all())
    };

    assert!(check(0, "2024-01-01").is_ok());
    assert!(check(100, "2024-12-31").is_ok());
    assert_eq!(check(-1, "2024-01-01").unwrap_err()[0].kind, ValidationErrorKind::BelowMinimum);
    assert_eq!(check(101, "2024-01-01").unwrap_err()[0].kind, ValidationErrorKind::AboveMaximum);
    assert_eq!(check(5, "2024-1-1").unwrap_err()[0].kind, ValidationErrorKind::PatternMismatch);
}

#[test]
fn test_unique_column() {
    let schema = ledger_schema();
    let value = ledger(&[(1, None, None), (2, None, None), (2, None, None), (3, None, None)]);
    let errors = validate(&value, &schema, &ValidateOptions::collect_all()).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ValidationErrorKind::Duplicate);
    assert_eq!(errors[0].path.to_string(), "$.id[2]");
}

#[test]
fn test_error_collection() {
    let schema = Schema::new(TypeDescriptor::array_with(
        TypeDescriptor::Int32,
        Constraints::new().min(0).max(100),
    ))
    .unwrap();
    let value = Value::Array(vec![Value::Int32(-1), Value::Int32(50), Value::Int32(101), Value::from("x")]);

    let all = validate(&value, &schema, &ValidateOptions::collect_all()).unwrap_err();
    assert_eq!(all.len(), 3);
    let paths: Vec<String> = all.iter().map(|e| e.path.to_string()).collect();
    assert_eq!(paths, vec!["$[0]", "$[2]", "$[3]"]);

    let first = validate(&value, &schema, &ValidateOptions::new()).unwrap_err();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].path.to_string(), "$[0]");
}

#[test]
fn test_schema_encode_truncation() {
    let schema = ledger_schema();
    let value = ledger(&[(7, Some("seven".to_string()), Some(Decimal::from_i64(7)))]);
    let bytes = encode(&value, &schema, EncodeOptions::deterministic()).unwrap();
    for len in 0..bytes.len() {
        assert!(decode(&bytes[..len], &schema).is_err(), "prefix of {} bytes decoded", len);
    }
}
