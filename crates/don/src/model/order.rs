//! Total ordering over values.
//!
//! Used for `min`/`max` bounds, `sorted` column checks and deterministic row
//! ordering. Values of the same variant compare by content; nulls sort first;
//! mismatched variants fall back to a fixed variant rank.

use std::cmp::Ordering;

use crate::model::value::Value;

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int8(_) => 2,
        Value::Int16(_) => 3,
        Value::Int32(_) => 4,
        Value::Int64(_) => 5,
        Value::BigInt(_) => 6,
        Value::Float32(_) => 7,
        Value::Float64(_) => 8,
        Value::Decimal(_) => 9,
        Value::String(_) => 10,
        Value::Bytes(_) => 11,
        Value::Uuid(_) => 12,
        Value::Date(_) => 13,
        Value::Time(_) => 14,
        Value::DateTime(_) => 15,
        Value::Duration(_) => 16,
        Value::Enum(_) => 17,
        Value::Object(_) => 18,
        Value::Array(_) => 19,
        Value::Frame(_) => 20,
    }
}

/// Compares two values under the DON total order.
///
/// Floats use IEEE-754 `totalOrder` (so NaN is ordered); strings compare by
/// UTF-8 bytes.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int8(x), Value::Int8(y)) => x.cmp(y),
        (Value::Int16(x), Value::Int16(y)) => x.cmp(y),
        (Value::Int32(x), Value::Int32(y)) => x.cmp(y),
        (Value::Int64(x), Value::Int64(y)) => x.cmp(y),
        (Value::BigInt(x), Value::BigInt(y)) => x.cmp(y),
        (Value::Float32(x), Value::Float32(y)) => x.total_cmp(y),
        (Value::Float64(x), Value::Float64(y)) => x.total_cmp(y),
        (Value::Decimal(x), Value::Decimal(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        (Value::Uuid(x), Value::Uuid(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Time(x), Value::Time(y)) => x.cmp(y),
        (Value::DateTime(x), Value::DateTime(y)) => x.cmp(y),
        (Value::Duration(x), Value::Duration(y)) => x.cmp(y),
        (Value::Enum(x), Value::Enum(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => compare_sequences(x, y),
        (Value::Object(x), Value::Object(y)) => {
            let xs = x.sorted_entries();
            let ys = y.sorted_entries();
            for ((kx, vx), (ky, vy)) in xs.iter().zip(ys.iter()) {
                let ord = kx.as_bytes().cmp(ky.as_bytes()).then_with(|| compare_values(vx, vy));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            xs.len().cmp(&ys.len())
        }
        (Value::Frame(x), Value::Frame(y)) => {
            let by_shape = x
                .row_count()
                .cmp(&y.row_count())
                .then_with(|| x.column_count().cmp(&y.column_count()));
            if by_shape != Ordering::Equal {
                return by_shape;
            }
            for (cx, cy) in x.columns().iter().zip(y.columns()) {
                let ord = cx
                    .name()
                    .as_bytes()
                    .cmp(cy.name().as_bytes())
                    .then_with(|| compare_sequences(cx.values(), cy.values()));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

fn compare_sequences(x: &[Value], y: &[Value]) -> Ordering {
    for (a, b) in x.iter().zip(y) {
        let ord = compare_values(a, b);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    x.len().cmp(&y.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::value::Object;

    #[test]
    fn test_nulls_first() {
        assert_eq!(compare_values(&Value::Null, &Value::Int32(i32::MIN)), Ordering::Less);
        assert_eq!(compare_values(&Value::Int32(0), &Value::Null), Ordering::Greater);
    }

    #[test]
    fn test_scalars() {
        assert_eq!(compare_values(&Value::Int64(-3), &Value::Int64(2)), Ordering::Less);
        assert_eq!(
            compare_values(&Value::Float64(-0.0), &Value::Float64(0.0)),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&Value::Float64(f64::NAN), &Value::Float64(f64::INFINITY)),
            Ordering::Greater
        );
        assert_eq!(compare_values(&"Z".into(), &"a".into()), Ordering::Less);
    }

    #[test]
    fn test_objects_ignore_insertion_order() {
        let a = Value::Object(Object::new().with("x", 1).with("y", 2));
        let b = Value::Object(Object::new().with("y", 2).with("x", 1));
        assert_eq!(compare_values(&a, &b), Ordering::Equal);
    }

    #[test]
    fn test_arrays_lexicographic() {
        let a = Value::Array(vec![Value::Int32(1), Value::Int32(2)]);
        let b = Value::Array(vec![Value::Int32(1), Value::Int32(2), Value::Int32(0)]);
        assert_eq!(compare_values(&a, &b), Ordering::Less);
    }
}
