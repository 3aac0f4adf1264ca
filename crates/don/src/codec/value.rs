//! Value encoding/decoding for the DON binary format.
//!
//! Two entry points per direction: the schema-driven path, which pins integer
//! widths and checks the wire against a [`TypeDescriptor`], and the dynamic
//! path, which needs no schema and packs integers as zigzag varints.

use rustc_hash::FxHashSet;

use crate::codec::frame;
use crate::codec::primitives::{Reader, Writer};
use crate::codec::tag::{TypeTag, WireTag};
use crate::error::{DecodeError, EncodeError, Path};
use crate::limits::{MAX_BYTES_LEN, MAX_COLLECTION_LEN, MAX_DEPTH, MAX_MANTISSA_BYTES, MAX_STRING_LEN};
use crate::model::number::{BigInt, Decimal};
use crate::model::schema::{ObjectType, TypeDescriptor};
use crate::model::value::{Object, Value};
use crate::util::datetime::MICROS_PER_DAY;

/// Temporal unit byte: value counts days.
const UNIT_DAYS: u8 = 0;
/// Temporal unit byte: value counts microseconds.
const UNIT_MICROS: u8 = 1;

/// Mantissa form marker: zigzag varint.
const MANTISSA_SMALL: u8 = 0x00;
/// Mantissa form marker: length-prefixed two's complement bytes.
const MANTISSA_BIG: u8 = 0x01;

const CANONICAL_NAN_F32: u32 = 0x7FC0_0000;
const CANONICAL_NAN_F64: u64 = 0x7FF8_0000_0000_0000;

// =============================================================================
// DECODING
// =============================================================================

/// Returns the nesting depth for a compound value's children.
pub(crate) fn enter(depth: usize, reader: &Reader<'_>) -> Result<usize, DecodeError> {
    let next = depth + 1;
    if next > MAX_DEPTH {
        return Err(DecodeError::DepthExceeded {
            max: MAX_DEPTH,
            offset: reader.position(),
        });
    }
    Ok(next)
}

/// Reads a tag byte.
pub(crate) fn read_tag(reader: &mut Reader<'_>, context: &'static str) -> Result<WireTag, DecodeError> {
    let offset = reader.position();
    WireTag::from_byte(reader.read_byte(context)?, offset)
}

/// Decodes a tagged value of type `ty`.
pub(crate) fn decode_value(
    reader: &mut Reader<'_>,
    ty: &TypeDescriptor,
    nullable: bool,
    depth: usize,
) -> Result<Value, DecodeError> {
    let offset = reader.position();
    let wire = read_tag(reader, "type tag")?;
    let expected = TypeTag::for_type(ty);

    if wire.tag == TypeTag::Null && (nullable || expected == Some(TypeTag::Null)) {
        return Ok(Value::Null);
    }
    if expected != Some(wire.tag) {
        return Err(DecodeError::TagMismatch {
            expected: expected.map(TypeTag::name).unwrap_or("resolved type"),
            found: wire.to_byte(),
            offset,
        });
    }
    decode_payload(reader, ty, wire.packed, depth)
}

/// Decodes the payload that follows a tag already matched against `ty`.
pub(crate) fn decode_payload(
    reader: &mut Reader<'_>,
    ty: &TypeDescriptor,
    packed: bool,
    depth: usize,
) -> Result<Value, DecodeError> {
    match ty {
        TypeDescriptor::FixedBytes(size) => {
            let offset = reader.position();
            let found = reader.read_count(MAX_BYTES_LEN, "fixed_bytes size")?;
            if found != *size {
                return Err(DecodeError::FixedSizeMismatch {
                    expected: *size,
                    found,
                    offset,
                });
            }
            Ok(Value::Bytes(reader.read_bytes(found, "fixed_bytes")?.to_vec()))
        }
        TypeDescriptor::Enum(e) => {
            let offset = reader.position();
            let discriminant = reader.read_signed_varint("enum")?;
            if !e.width().contains(discriminant) {
                return Err(DecodeError::IntegerOutOfRange {
                    width: e.width().name(),
                    offset,
                });
            }
            Ok(Value::Enum(discriminant))
        }
        TypeDescriptor::Object(object) => decode_object(reader, object, depth),
        TypeDescriptor::Array(array) => {
            let depth = enter(depth, reader)?;
            let count = reader.read_collection_len(MAX_COLLECTION_LEN, 1, "array")?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(decode_value(
                    reader,
                    &array.items,
                    array.item_constraints.nullable,
                    depth,
                )?);
            }
            Ok(Value::Array(items))
        }
        TypeDescriptor::Frame(frame_type) => frame::decode_frame(reader, frame_type, depth),
        TypeDescriptor::Ref(_) => Err(DecodeError::TagMismatch {
            expected: "resolved type",
            found: 0,
            offset: reader.position(),
        }),
        scalar => match TypeTag::for_type(scalar) {
            Some(tag) => decode_scalar(reader, tag, packed),
            None => Err(DecodeError::TagMismatch {
                expected: "resolved type",
                found: 0,
                offset: reader.position(),
            }),
        },
    }
}

fn decode_object(reader: &mut Reader<'_>, ty: &ObjectType, depth: usize) -> Result<Value, DecodeError> {
    let depth = enter(depth, reader)?;
    let count = reader.read_collection_len(MAX_COLLECTION_LEN, 2, "object")?;
    let mut object = Object::with_capacity(count);
    let mut seen = FxHashSet::default();

    for _ in 0..count {
        let key_offset = reader.position();
        let key = reader.read_string(MAX_STRING_LEN, "object key")?;
        let field = ty.field(&key).ok_or_else(|| DecodeError::UnknownField {
            key: key.clone(),
            offset: key_offset,
        })?;
        if !seen.insert(key.clone()) {
            return Err(DecodeError::DuplicateKey { key, offset: key_offset });
        }
        let value = decode_value(reader, &field.ty, field.constraints.nullable, depth)?;
        object.insert(key, value);
    }

    if let Some(missing) = ty
        .fields
        .iter()
        .find(|f| !f.constraints.nullable && !seen.contains(&f.name))
    {
        return Err(DecodeError::MissingField {
            field: missing.name.clone(),
            offset: reader.position(),
        });
    }
    Ok(Value::Object(object))
}

/// Decodes a tagged value without a schema.
pub(crate) fn decode_dynamic_value(reader: &mut Reader<'_>, depth: usize) -> Result<Value, DecodeError> {
    let wire = read_tag(reader, "type tag")?;
    decode_dynamic_payload(reader, wire, depth)
}

/// Decodes the payload that follows `wire` without a schema.
pub(crate) fn decode_dynamic_payload(
    reader: &mut Reader<'_>,
    wire: WireTag,
    depth: usize,
) -> Result<Value, DecodeError> {
    match wire.tag {
        TypeTag::Object => {
            let depth = enter(depth, reader)?;
            let count = reader.read_collection_len(MAX_COLLECTION_LEN, 2, "object")?;
            let mut object = Object::with_capacity(count);
            let mut seen = FxHashSet::default();
            for _ in 0..count {
                let key_offset = reader.position();
                let key = reader.read_string(MAX_STRING_LEN, "object key")?;
                if !seen.insert(key.clone()) {
                    return Err(DecodeError::DuplicateKey { key, offset: key_offset });
                }
                let value = decode_dynamic_value(reader, depth)?;
                object.insert(key, value);
            }
            Ok(Value::Object(object))
        }
        TypeTag::Array => {
            let depth = enter(depth, reader)?;
            let count = reader.read_collection_len(MAX_COLLECTION_LEN, 1, "array")?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(decode_dynamic_value(reader, depth)?);
            }
            Ok(Value::Array(items))
        }
        TypeTag::Frame => frame::decode_frame_dynamic(reader, depth),
        tag => decode_scalar(reader, tag, wire.packed),
    }
}

/// Decodes a scalar payload (no tag). `fixed_bytes` yields plain bytes.
pub(crate) fn decode_scalar(reader: &mut Reader<'_>, tag: TypeTag, packed: bool) -> Result<Value, DecodeError> {
    let offset = reader.position();
    Ok(match tag {
        TypeTag::Null => Value::Null,
        TypeTag::Bool => Value::Bool(reader.read_bool("bool")?),
        TypeTag::Int8 if packed => Value::Int8(narrow(reader.read_signed_varint("int8")?, "int8", offset)?),
        TypeTag::Int8 => Value::Int8(reader.read_i8("int8")?),
        TypeTag::Int16 if packed => Value::Int16(narrow(reader.read_signed_varint("int16")?, "int16", offset)?),
        TypeTag::Int16 => Value::Int16(reader.read_i16("int16")?),
        TypeTag::Int32 if packed => Value::Int32(narrow(reader.read_signed_varint("int32")?, "int32", offset)?),
        TypeTag::Int32 => Value::Int32(reader.read_i32("int32")?),
        TypeTag::Int64 if packed => Value::Int64(reader.read_signed_varint("int64")?),
        TypeTag::Int64 => Value::Int64(reader.read_i64("int64")?),
        TypeTag::BigInt => Value::BigInt(read_mantissa(reader, "bigint")?),
        TypeTag::Float32 => Value::Float32(reader.read_f32("float32")?),
        TypeTag::Float64 => Value::Float64(reader.read_f64("float64")?),
        TypeTag::Decimal => Value::Decimal(read_decimal(reader)?),
        TypeTag::String => Value::String(reader.read_string(MAX_STRING_LEN, "string")?),
        TypeTag::Bytes => Value::Bytes(reader.read_bytes_prefixed(MAX_BYTES_LEN, "bytes")?),
        TypeTag::FixedBytes => {
            let size = reader.read_length(MAX_BYTES_LEN, "fixed_bytes size")?;
            Value::Bytes(reader.read_bytes(size, "fixed_bytes")?.to_vec())
        }
        TypeTag::Uuid => Value::Uuid(uuid::Uuid::from_bytes(reader.read_array("uuid")?)),
        TypeTag::Date => {
            let days = read_temporal(reader, UNIT_DAYS, "date")?;
            Value::Date(narrow(days, "date", offset)?)
        }
        TypeTag::Time => {
            let micros = read_temporal(reader, UNIT_MICROS, "time")?;
            if !(0..MICROS_PER_DAY).contains(&micros) {
                return Err(DecodeError::OutOfRange {
                    context: "time of day",
                    offset,
                });
            }
            Value::Time(micros)
        }
        TypeTag::DateTime => Value::DateTime(read_temporal(reader, UNIT_MICROS, "datetime")?),
        TypeTag::Duration => Value::Duration(read_temporal(reader, UNIT_MICROS, "duration")?),
        TypeTag::Enum => Value::Enum(reader.read_signed_varint("enum")?),
        TypeTag::Object | TypeTag::Array | TypeTag::Frame => {
            return Err(DecodeError::TagMismatch {
                expected: "scalar",
                found: tag as u8,
                offset,
            });
        }
    })
}

fn narrow<T: TryFrom<i64>>(value: i64, width: &'static str, offset: usize) -> Result<T, DecodeError> {
    T::try_from(value).map_err(|_| DecodeError::IntegerOutOfRange { width, offset })
}

fn read_temporal(reader: &mut Reader<'_>, unit: u8, context: &'static str) -> Result<i64, DecodeError> {
    let value = reader.read_i64(context)?;
    let unit_offset = reader.position();
    if reader.read_byte(context)? != unit {
        return Err(DecodeError::OutOfRange {
            context: "temporal unit",
            offset: unit_offset,
        });
    }
    Ok(value)
}

fn read_mantissa(reader: &mut Reader<'_>, context: &'static str) -> Result<BigInt, DecodeError> {
    let offset = reader.position();
    match reader.read_byte(context)? {
        MANTISSA_SMALL => Ok(BigInt::from_i64(reader.read_signed_varint(context)?)),
        MANTISSA_BIG => {
            let len = reader.read_length(MAX_MANTISSA_BYTES, context)?;
            let bytes_offset = reader.position();
            let bytes = reader.read_bytes(len, context)?;
            if !BigInt::is_minimal_twos_complement(bytes) {
                return Err(DecodeError::NotCanonical {
                    context: "mantissa bytes",
                    offset: bytes_offset,
                });
            }
            let value = BigInt::from_twos_complement(bytes);
            // Values that fit in i64 must use the varint form
            if value.to_i64().is_some() {
                return Err(DecodeError::NotCanonical {
                    context: "mantissa form",
                    offset,
                });
            }
            Ok(value)
        }
        _ => Err(DecodeError::OutOfRange {
            context: "mantissa form marker",
            offset,
        }),
    }
}

fn read_decimal(reader: &mut Reader<'_>) -> Result<Decimal, DecodeError> {
    let offset = reader.position();
    let exponent = reader.read_signed_varint("decimal exponent")?;
    let exponent = i32::try_from(exponent).map_err(|_| DecodeError::OutOfRange {
        context: "decimal exponent",
        offset,
    })?;
    let mantissa = read_mantissa(reader, "decimal mantissa")?;
    if !Decimal::is_normalized(&mantissa, exponent) {
        return Err(DecodeError::NotCanonical {
            context: "decimal",
            offset,
        });
    }
    Ok(Decimal::new(mantissa, exponent))
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes `value` as a tagged value of type `ty`.
pub(crate) fn encode_value(
    writer: &mut Writer,
    value: &Value,
    ty: &TypeDescriptor,
    nullable: bool,
    deterministic: bool,
    path: &Path,
) -> Result<(), EncodeError> {
    if value.is_null() {
        if nullable || matches!(ty, TypeDescriptor::Null) {
            writer.write_byte(TypeTag::Null as u8);
            return Ok(());
        }
        return Err(EncodeError::UnexpectedNull { path: path.clone() });
    }
    let tag = TypeTag::for_type(ty).ok_or_else(|| type_mismatch(ty, value, path))?;
    writer.write_byte(tag as u8);
    encode_payload(writer, value, ty, deterministic, path)
}

/// Encodes the untagged payload of a non-null `value` of type `ty`.
pub(crate) fn encode_payload(
    writer: &mut Writer,
    value: &Value,
    ty: &TypeDescriptor,
    deterministic: bool,
    path: &Path,
) -> Result<(), EncodeError> {
    match (ty, value) {
        (TypeDescriptor::FixedBytes(size), Value::Bytes(bytes)) => {
            check_fixed_size(bytes, *size, path)?;
            writer.write_varint(*size as u64);
            writer.write_bytes(bytes);
            Ok(())
        }
        (TypeDescriptor::Enum(e), Value::Enum(discriminant)) => {
            if !e.width().contains(*discriminant) {
                return Err(EncodeError::OutOfRange {
                    path: path.clone(),
                    context: "enum discriminant",
                });
            }
            writer.write_signed_varint(*discriminant);
            Ok(())
        }
        (TypeDescriptor::Object(object_type), Value::Object(object)) => {
            encode_object(writer, object, object_type, deterministic, path)
        }
        (TypeDescriptor::Array(array_type), Value::Array(items)) => {
            check_limit("array", items.len(), MAX_COLLECTION_LEN)?;
            writer.write_varint(items.len() as u64);
            for (i, item) in items.iter().enumerate() {
                encode_value(
                    writer,
                    item,
                    &array_type.items,
                    array_type.item_constraints.nullable,
                    deterministic,
                    &path.index(i),
                )?;
            }
            Ok(())
        }
        (TypeDescriptor::Frame(frame_type), Value::Frame(f)) => {
            frame::encode_frame(writer, f, frame_type, deterministic, path)
        }
        _ if ty.accepts_variant(value) => write_scalar(writer, value, false, deterministic, path),
        _ => Err(type_mismatch(ty, value, path)),
    }
}

fn encode_object(
    writer: &mut Writer,
    object: &Object,
    ty: &ObjectType,
    deterministic: bool,
    path: &Path,
) -> Result<(), EncodeError> {
    check_limit("object", object.len(), MAX_COLLECTION_LEN)?;
    if let Some(missing) = ty
        .fields
        .iter()
        .find(|f| !f.constraints.nullable && !object.contains_key(&f.name))
    {
        return Err(EncodeError::MissingField {
            path: path.clone(),
            field: missing.name.clone(),
        });
    }

    let entries = if deterministic {
        object.sorted_entries()
    } else {
        object.iter().collect()
    };
    writer.write_varint(entries.len() as u64);
    for (key, value) in entries {
        let field = ty.field(key).ok_or_else(|| EncodeError::UnknownField {
            path: path.clone(),
            field: key.to_string(),
        })?;
        writer.write_string(key);
        encode_value(
            writer,
            value,
            &field.ty,
            field.constraints.nullable,
            deterministic,
            &path.key(key),
        )?;
    }
    Ok(())
}

/// Encodes `value` as a tagged value without a schema.
pub(crate) fn encode_dynamic_value(
    writer: &mut Writer,
    value: &Value,
    deterministic: bool,
    path: &Path,
) -> Result<(), EncodeError> {
    writer.write_byte(WireTag::packed(TypeTag::of(value)).to_byte());
    encode_dynamic_payload(writer, value, deterministic, path)
}

/// Encodes the untagged payload of `value` without a schema.
pub(crate) fn encode_dynamic_payload(
    writer: &mut Writer,
    value: &Value,
    deterministic: bool,
    path: &Path,
) -> Result<(), EncodeError> {
    match value {
        Value::Object(object) => {
            check_limit("object", object.len(), MAX_COLLECTION_LEN)?;
            let entries = if deterministic {
                object.sorted_entries()
            } else {
                object.iter().collect()
            };
            writer.write_varint(entries.len() as u64);
            for (key, value) in entries {
                writer.write_string(key);
                encode_dynamic_value(writer, value, deterministic, &path.key(key))?;
            }
            Ok(())
        }
        Value::Array(items) => {
            check_limit("array", items.len(), MAX_COLLECTION_LEN)?;
            writer.write_varint(items.len() as u64);
            for (i, item) in items.iter().enumerate() {
                encode_dynamic_value(writer, item, deterministic, &path.index(i))?;
            }
            Ok(())
        }
        Value::Frame(f) => frame::encode_frame_dynamic(writer, f, deterministic, path),
        scalar => write_scalar(writer, scalar, true, deterministic, path),
    }
}

/// Writes a scalar payload. `packed` selects varint integers.
pub(crate) fn write_scalar(
    writer: &mut Writer,
    value: &Value,
    packed: bool,
    deterministic: bool,
    path: &Path,
) -> Result<(), EncodeError> {
    match value {
        Value::Null => {}
        Value::Bool(v) => writer.write_bool(*v),
        Value::Int8(v) if packed => writer.write_signed_varint(*v as i64),
        Value::Int8(v) => writer.write_i8(*v),
        Value::Int16(v) if packed => writer.write_signed_varint(*v as i64),
        Value::Int16(v) => writer.write_i16(*v),
        Value::Int32(v) if packed => writer.write_signed_varint(*v as i64),
        Value::Int32(v) => writer.write_i32(*v),
        Value::Int64(v) if packed => writer.write_signed_varint(*v),
        Value::Int64(v) => writer.write_i64(*v),
        Value::BigInt(v) => write_mantissa(writer, v)?,
        Value::Float32(v) => {
            let v = if deterministic && v.is_nan() {
                f32::from_bits(CANONICAL_NAN_F32)
            } else {
                *v
            };
            writer.write_f32(v);
        }
        Value::Float64(v) => {
            let v = if deterministic && v.is_nan() {
                f64::from_bits(CANONICAL_NAN_F64)
            } else {
                *v
            };
            writer.write_f64(v);
        }
        Value::Decimal(d) => {
            writer.write_signed_varint(d.exponent() as i64);
            write_mantissa(writer, d.mantissa())?;
        }
        Value::String(s) => {
            check_limit("string", s.len(), MAX_STRING_LEN)?;
            writer.write_string(s);
        }
        Value::Bytes(b) => {
            check_limit("bytes", b.len(), MAX_BYTES_LEN)?;
            writer.write_bytes_prefixed(b);
        }
        Value::Uuid(u) => writer.write_bytes(u.as_bytes()),
        Value::Date(days) => write_temporal(writer, *days as i64, UNIT_DAYS),
        Value::Time(micros) => {
            if !(0..MICROS_PER_DAY).contains(micros) {
                return Err(EncodeError::OutOfRange {
                    path: path.clone(),
                    context: "time of day",
                });
            }
            write_temporal(writer, *micros, UNIT_MICROS);
        }
        Value::DateTime(micros) | Value::Duration(micros) => write_temporal(writer, *micros, UNIT_MICROS),
        Value::Enum(discriminant) => writer.write_signed_varint(*discriminant),
        Value::Object(_) | Value::Array(_) | Value::Frame(_) => {
            return Err(EncodeError::TypeMismatch {
                path: path.clone(),
                expected: "scalar".to_string(),
                found: value.type_name(),
            });
        }
    }
    Ok(())
}

fn write_temporal(writer: &mut Writer, value: i64, unit: u8) {
    writer.write_i64(value);
    writer.write_byte(unit);
}

fn write_mantissa(writer: &mut Writer, value: &BigInt) -> Result<(), EncodeError> {
    match value.to_i64() {
        Some(small) => {
            writer.write_byte(MANTISSA_SMALL);
            writer.write_signed_varint(small);
        }
        None => {
            let bytes = value.to_twos_complement();
            check_limit("mantissa", bytes.len(), MAX_MANTISSA_BYTES)?;
            writer.write_byte(MANTISSA_BIG);
            writer.write_bytes_prefixed(&bytes);
        }
    }
    Ok(())
}

pub(crate) fn check_fixed_size(bytes: &[u8], size: usize, path: &Path) -> Result<(), EncodeError> {
    if bytes.len() != size {
        return Err(EncodeError::FixedSizeMismatch {
            path: path.clone(),
            expected: size,
            found: bytes.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_limit(field: &'static str, len: usize, max: usize) -> Result<(), EncodeError> {
    if len > max {
        return Err(EncodeError::LengthExceedsLimit { field, len, max });
    }
    Ok(())
}

pub(crate) fn type_mismatch(ty: &TypeDescriptor, value: &Value, path: &Path) -> EncodeError {
    EncodeError::TypeMismatch {
        path: path.clone(),
        expected: ty.to_string(),
        found: value.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schema::{EnumType, Field, IntWidth};

    fn encode_schema(value: &Value, ty: &TypeDescriptor) -> Vec<u8> {
        let mut writer = Writer::new();
        encode_value(&mut writer, value, ty, false, false, &Path::root()).unwrap();
        writer.into_bytes()
    }

    fn roundtrip(value: Value, ty: TypeDescriptor) {
        let bytes = encode_schema(&value, &ty);
        let mut reader = Reader::new(&bytes);
        let decoded = decode_value(&mut reader, &ty, false, 0).unwrap();
        assert_eq!(decoded, value);
        assert!(reader.is_empty());

        let mut writer = Writer::new();
        encode_dynamic_value(&mut writer, &value, false, &Path::root()).unwrap();
        let mut reader = Reader::new(writer.as_bytes());
        assert_eq!(decode_dynamic_value(&mut reader, 0).unwrap(), value);
    }

    #[test]
    fn test_fixed_width_integer_layout() {
        assert_eq!(encode_schema(&Value::Int32(1), &TypeDescriptor::Int32), vec![0x04, 1, 0, 0, 0]);

        let mut writer = Writer::new();
        encode_dynamic_value(&mut writer, &Value::Int32(-1), false, &Path::root()).unwrap();
        assert_eq!(writer.as_bytes(), &[0x84, 0x01]);
    }

    #[test]
    fn test_schema_decoder_accepts_packed_integers() {
        let bytes = [0x84, 0x02];
        let mut reader = Reader::new(&bytes);
        assert_eq!(
            decode_value(&mut reader, &TypeDescriptor::Int32, false, 0).unwrap(),
            Value::Int32(1)
        );

        let too_big = [0x82, 0x80, 0x04];
        let mut reader = Reader::new(&too_big);
        assert!(matches!(
            decode_value(&mut reader, &TypeDescriptor::Int8, false, 0),
            Err(DecodeError::IntegerOutOfRange { width: "int8", offset: 1 })
        ));
    }

    #[test]
    fn test_scalar_roundtrips() {
        roundtrip(Value::Bool(true), TypeDescriptor::Bool);
        roundtrip(Value::Int64(i64::MIN), TypeDescriptor::Int64);
        roundtrip(Value::Float32(-1.5), TypeDescriptor::Float32);
        roundtrip("héllo".into(), TypeDescriptor::String);
        roundtrip(Value::Bytes(vec![0, 255]), TypeDescriptor::Bytes);
        roundtrip(Value::Uuid(uuid::Uuid::from_bytes([7; 16])), TypeDescriptor::Uuid);
        roundtrip(Value::Date(-719_162), TypeDescriptor::Date);
        roundtrip(Value::Time(MICROS_PER_DAY - 1), TypeDescriptor::Time);
        roundtrip(Value::Duration(-5), TypeDescriptor::Duration);
    }

    #[test]
    fn test_bigint_and_decimal_forms() {
        let big: BigInt = "-123456789012345678901234567890".parse().unwrap();
        roundtrip(Value::BigInt(big), TypeDescriptor::BigInt);
        roundtrip(Value::BigInt(BigInt::from_i64(42)), TypeDescriptor::BigInt);

        let dec: Decimal = "12345678901234567890.123456789".parse().unwrap();
        roundtrip(Value::Decimal(dec), TypeDescriptor::Decimal);

        // 42 as a big mantissa is not canonical
        let bytes = [0x06, MANTISSA_BIG, 0x01, 42];
        let mut reader = Reader::new(&bytes);
        assert!(matches!(
            decode_value(&mut reader, &TypeDescriptor::BigInt, false, 0),
            Err(DecodeError::NotCanonical { .. })
        ));
    }

    #[test]
    fn test_decimal_not_normalized_rejected() {
        // mantissa 10, exponent 0
        let bytes = [0x09, 0x00, MANTISSA_SMALL, 20];
        let mut reader = Reader::new(&bytes);
        assert!(matches!(
            decode_value(&mut reader, &TypeDescriptor::Decimal, false, 0),
            Err(DecodeError::NotCanonical { context: "decimal", .. })
        ));
    }

    #[test]
    fn test_fixed_bytes() {
        roundtrip(Value::Bytes(vec![1, 2, 3]), TypeDescriptor::FixedBytes(3));

        let mut writer = Writer::new();
        let result = encode_value(
            &mut writer,
            &Value::Bytes(vec![1, 2]),
            &TypeDescriptor::FixedBytes(3),
            false,
            false,
            &Path::root(),
        );
        assert!(matches!(result, Err(EncodeError::FixedSizeMismatch { expected: 3, found: 2, .. })));

        let bytes = encode_schema(&Value::Bytes(vec![1, 2]), &TypeDescriptor::FixedBytes(2));
        let mut reader = Reader::new(&bytes);
        assert!(matches!(
            decode_value(&mut reader, &TypeDescriptor::FixedBytes(3), false, 0),
            Err(DecodeError::FixedSizeMismatch { expected: 3, found: 2, .. })
        ));
    }

    #[test]
    fn test_enum_width_checked() {
        let ty = TypeDescriptor::Enum(EnumType::new("Level", IntWidth::I8).variant("low", 0));
        roundtrip(Value::Enum(0), ty.clone());
        // Membership is not checked by the codec
        roundtrip(Value::Enum(99), ty.clone());

        let mut writer = Writer::new();
        let result = encode_value(&mut writer, &Value::Enum(1000), &ty, false, false, &Path::root());
        assert!(matches!(result, Err(EncodeError::OutOfRange { .. })));
    }

    #[test]
    fn test_object_schema_checks() {
        let ty = TypeDescriptor::object(vec![
            Field::new("id", TypeDescriptor::Int64),
            Field::new("note", TypeDescriptor::String).nullable(),
        ]);
        roundtrip(Value::Object(Object::new().with("id", 1i64)), ty.clone());
        roundtrip(
            Value::Object(Object::new().with("note", Value::Null).with("id", 2i64)),
            ty.clone(),
        );

        let mut writer = Writer::new();
        let extra = Value::Object(Object::new().with("id", 1i64).with("x", true));
        assert!(matches!(
            encode_value(&mut writer, &extra, &ty, false, false, &Path::root()),
            Err(EncodeError::UnknownField { .. })
        ));

        let missing = Value::Object(Object::new().with("note", "hi"));
        assert!(matches!(
            encode_value(&mut writer, &missing, &ty, false, false, &Path::root()),
            Err(EncodeError::MissingField { .. })
        ));
    }

    #[test]
    fn test_deterministic_object_key_order() {
        let a = Value::Object(Object::new().with("b", 1).with("a", 2));
        let b = Value::Object(Object::new().with("a", 2).with("b", 1));
        let encode = |v: &Value| {
            let mut writer = Writer::new();
            encode_dynamic_value(&mut writer, v, true, &Path::root()).unwrap();
            writer.into_bytes()
        };
        assert_eq!(encode(&a), encode(&b));
    }

    #[test]
    fn test_canonical_nan() {
        let odd_nan = f64::from_bits(0x7FF8_0000_0000_0001);
        let mut writer = Writer::new();
        write_scalar(&mut writer, &Value::Float64(odd_nan), false, true, &Path::root()).unwrap();
        assert_eq!(writer.as_bytes(), &CANONICAL_NAN_F64.to_le_bytes());
    }

    #[test]
    fn test_type_mismatch_path() {
        let ty = TypeDescriptor::array(TypeDescriptor::Int32);
        let value = Value::Array(vec![Value::Int32(1), Value::Int64(2)]);
        let mut writer = Writer::new();
        let err = encode_value(&mut writer, &value, &ty, false, false, &Path::root()).unwrap_err();
        assert_eq!(err.to_string(), "$[1]: expected int32, found int64");
    }

    #[test]
    fn test_null_requires_nullable() {
        let bytes = [0x00];
        let mut reader = Reader::new(&bytes);
        assert!(matches!(
            decode_value(&mut reader, &TypeDescriptor::Int32, false, 0),
            Err(DecodeError::TagMismatch { expected: "int32", .. })
        ));
        let mut reader = Reader::new(&bytes);
        assert_eq!(decode_value(&mut reader, &TypeDescriptor::Int32, true, 0).unwrap(), Value::Null);
    }

    #[test]
    fn test_dynamic_depth_limit() {
        let mut bytes = vec![TypeTag::Array as u8, 1].repeat(MAX_DEPTH + 1);
        bytes.push(TypeTag::Null as u8);
        let mut reader = Reader::new(&bytes);
        assert!(matches!(
            decode_dynamic_value(&mut reader, 0),
            Err(DecodeError::DepthExceeded { .. })
        ));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let bytes = [TypeTag::Object as u8, 2, 1, b'a', 0x00, 1, b'a', 0x00];
        let mut reader = Reader::new(&bytes);
        assert!(matches!(
            decode_dynamic_value(&mut reader, 0),
            Err(DecodeError::DuplicateKey { offset: 5, .. })
        ));
    }
}
