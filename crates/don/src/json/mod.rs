//! Schema-driven JSON bridge.
//!
//! Maps values to and from `serde_json` trees. JSON cannot carry every DON
//! type natively, so some types travel as strings:
//!
//! | DON type            | JSON                                              |
//! |---------------------|---------------------------------------------------|
//! | int8..int32         | number                                            |
//! | int64               | number within ±(2^53−1), else decimal string      |
//! | bigint, decimal     | string                                            |
//! | float32, float64    | number; `"NaN"`, `"Infinity"`, `"-Infinity"`      |
//! | bytes, fixed_bytes  | base64 string (standard alphabet, padded)         |
//! | uuid                | hyphenated lowercase string                       |
//! | date/time/datetime  | ISO 8601 text, datetime always in UTC (`Z`)       |
//! | duration            | ISO 8601 duration `[-]P[nD][T[nH][nM][n[.f]S]]`   |
//! | enum                | variant name (a numeric discriminant is accepted) |
//! | frame               | `{"$frame": true, "rows", "columns", "data"}`     |
//!
//! Missing object fields stay absent; reporting them is the validator's job.
//!
//! [`from_json_str`] rejects an object that repeats a key, as the binary
//! decoder does. [`from_json`] takes an already-parsed tree, where any
//! repeat was resolved by whoever parsed it.

use base64::engine::general_purpose::STANDARD;
use std::fmt;

use base64::Engine;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Number, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use crate::error::{JsonError, Path};
use crate::limits::JSON_SAFE_INTEGER;
use crate::model::number::{BigInt, Decimal};
use crate::model::schema::{EnumType, FrameType, IntWidth, ObjectType, Schema, TypeDescriptor};
use crate::model::value::{Frame, FrameColumn, Object, Value};
use crate::util::datetime;

/// Reserved key marking a JSON object as a frame.
pub const FRAME_MARKER: &str = "$frame";

const NAN: &str = "NaN";
const INFINITY: &str = "Infinity";
const NEG_INFINITY: &str = "-Infinity";

// =============================================================================
// VALUE -> JSON
// =============================================================================

/// Renders `value` as JSON under `schema`.
pub fn to_json(value: &Value, schema: &Schema) -> Result<JsonValue, JsonError> {
    let json = render(value, schema.root(), schema.constraints().nullable, &Path::root())?;
    debug!(root = value.type_name(), "rendered JSON");
    Ok(json)
}

/// Renders `value` as compact JSON text under `schema`.
pub fn to_json_string(value: &Value, schema: &Schema) -> Result<String, JsonError> {
    Ok(serde_json::to_string(&to_json(value, schema)?)?)
}

/// Renders any value without a schema.
///
/// Enums come out as bare discriminants since their names live in the schema.
pub fn to_json_dynamic(value: &Value) -> JsonValue {
    match value {
        Value::Object(object) => JsonValue::Object(
            object
                .iter()
                .map(|(k, v)| (k.to_string(), to_json_dynamic(v)))
                .collect(),
        ),
        Value::Array(items) => JsonValue::Array(items.iter().map(to_json_dynamic).collect()),
        Value::Frame(frame) => frame_json(frame, |_, _, cell| Ok(to_json_dynamic(cell)))
            .unwrap_or(JsonValue::Null),
        scalar => scalar_json(scalar),
    }
}

fn render(value: &Value, ty: &TypeDescriptor, nullable: bool, path: &Path) -> Result<JsonValue, JsonError> {
    if value.is_null() {
        if nullable || matches!(ty, TypeDescriptor::Null) {
            return Ok(JsonValue::Null);
        }
        return Err(type_mismatch(ty, "null", path));
    }
    if !ty.accepts_variant(value) {
        return Err(type_mismatch(ty, value.type_name(), path));
    }

    match (ty, value) {
        (TypeDescriptor::FixedBytes(size), Value::Bytes(bytes)) if bytes.len() != *size => {
            Err(JsonError::InvalidText {
                path: path.clone(),
                expected: "fixed_bytes",
                text: STANDARD.encode(bytes),
                reason: format!("expected {} bytes, found {}", size, bytes.len()),
            })
        }
        (TypeDescriptor::Enum(enum_type), Value::Enum(d)) => match enum_type.name_of(*d) {
            Some(name) => Ok(JsonValue::String(name.to_string())),
            None => Err(JsonError::UnknownEnumVariant {
                path: path.clone(),
                name: d.to_string(),
            }),
        },
        (TypeDescriptor::Object(object_type), Value::Object(object)) => {
            let mut map = Map::with_capacity(object.len());
            for (key, field_value) in object.iter() {
                let field = object_type.field(key).ok_or_else(|| JsonError::UnknownField {
                    path: path.clone(),
                    field: key.to_string(),
                })?;
                let json = render(field_value, &field.ty, field.constraints.nullable, &path.key(key))?;
                map.insert(key.to_string(), json);
            }
            Ok(JsonValue::Object(map))
        }
        (TypeDescriptor::Array(array_type), Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                render(
                    item,
                    &array_type.items,
                    array_type.item_constraints.nullable,
                    &path.index(i),
                )
            })
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array),
        (TypeDescriptor::Frame(frame_type), Value::Frame(frame)) => {
            check_frame_columns(frame, frame_type, path)?;
            frame_json(frame, |col, row, cell| {
                let column = &frame_type.columns[col];
                let cell_path = path.key(&column.name).index(row);
                render(cell, &column.ty, column.constraints.nullable, &cell_path)
            })
        }
        (_, scalar) => Ok(scalar_json(scalar)),
    }
}

fn check_frame_columns(frame: &Frame, ty: &FrameType, path: &Path) -> Result<(), JsonError> {
    let found: Vec<&str> = frame.columns().iter().map(FrameColumn::name).collect();
    let expected: Vec<&str> = ty.columns.iter().map(|c| c.name.as_str()).collect();
    if found != expected {
        return Err(JsonError::ColumnMismatch {
            path: path.clone(),
            message: format!("expected {:?}, found {:?}", expected, found),
        });
    }
    Ok(())
}

/// Builds the frame object, rendering each cell with `cell(column, row, value)`.
fn frame_json<F>(frame: &Frame, mut cell: F) -> Result<JsonValue, JsonError>
where
    F: FnMut(usize, usize, &Value) -> Result<JsonValue, JsonError>,
{
    let mut data = Map::with_capacity(frame.column_count());
    for (col, column) in frame.columns().iter().enumerate() {
        let cells = column
            .values()
            .iter()
            .enumerate()
            .map(|(row, v)| cell(col, row, v))
            .collect::<Result<Vec<_>, _>>()?;
        data.insert(column.name().to_string(), JsonValue::Array(cells));
    }

    let mut map = Map::with_capacity(4);
    map.insert(FRAME_MARKER.to_string(), JsonValue::Bool(true));
    map.insert("rows".to_string(), JsonValue::from(frame.row_count()));
    map.insert(
        "columns".to_string(),
        JsonValue::Array(
            frame
                .columns()
                .iter()
                .map(|c| JsonValue::String(c.name().to_string()))
                .collect(),
        ),
    );
    map.insert("data".to_string(), JsonValue::Object(data));
    Ok(JsonValue::Object(map))
}

fn float_json(value: f64, shortest: impl FnOnce() -> String) -> JsonValue {
    if value.is_nan() {
        return JsonValue::String(NAN.to_string());
    }
    if value.is_infinite() {
        let text = if value > 0.0 { INFINITY } else { NEG_INFINITY };
        return JsonValue::String(text.to_string());
    }
    // Shortest round-trip text keeps float32 values free of widening noise
    let number = shortest()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .or_else(|| Number::from_f64(value));
    number.map(JsonValue::Number).unwrap_or(JsonValue::Null)
}

/// JSON form of a leaf value; compound values never reach here.
fn scalar_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(v) => JsonValue::Bool(*v),
        Value::Int8(v) => JsonValue::from(*v),
        Value::Int16(v) => JsonValue::from(*v),
        Value::Int32(v) => JsonValue::from(*v),
        Value::Int64(v) => {
            if v.unsigned_abs() <= JSON_SAFE_INTEGER as u64 {
                JsonValue::from(*v)
            } else {
                JsonValue::String(v.to_string())
            }
        }
        Value::Enum(v) => JsonValue::from(*v),
        Value::BigInt(v) => JsonValue::String(v.to_string()),
        Value::Decimal(v) => JsonValue::String(v.to_string()),
        Value::Float32(v) => float_json(*v as f64, || v.to_string()),
        Value::Float64(v) => float_json(*v, || v.to_string()),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Bytes(b) => JsonValue::String(STANDARD.encode(b)),
        Value::Uuid(u) => JsonValue::String(u.hyphenated().to_string()),
        Value::Date(d) => JsonValue::String(datetime::format_date(*d)),
        Value::Time(t) => JsonValue::String(datetime::format_time(*t)),
        Value::DateTime(t) => JsonValue::String(datetime::format_datetime(*t)),
        Value::Duration(d) => JsonValue::String(datetime::format_duration(*d)),
        Value::Object(_) | Value::Array(_) | Value::Frame(_) => JsonValue::Null,
    }
}

// =============================================================================
// JSON -> VALUE
// =============================================================================

/// Reads a value from JSON under `schema`.
pub fn from_json(json: &JsonValue, schema: &Schema) -> Result<Value, JsonError> {
    let value = parse(json, schema.root(), schema.constraints().nullable, &Path::root())?;
    debug!(root = value.type_name(), "parsed JSON");
    Ok(value)
}

/// Parses JSON text and reads a value from it under `schema`.
///
/// Fails with [`JsonError::Syntax`] when an object repeats a key.
pub fn from_json_str(text: &str, schema: &Schema) -> Result<Value, JsonError> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    let StrictJson(json) = StrictJson::deserialize(&mut deserializer)?;
    deserializer.end()?;
    from_json(&json, schema)
}

/// JSON tree read with duplicate object keys rejected.
struct StrictJson(JsonValue);

impl<'de> Deserialize<'de> for StrictJson {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(StrictJsonVisitor).map(StrictJson)
    }
}

struct StrictJsonVisitor;

impl<'de> Visitor<'de> for StrictJsonVisitor {
    type Value = JsonValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<JsonValue, E> {
        Ok(JsonValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<JsonValue, E> {
        Ok(JsonValue::Number(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<JsonValue, E> {
        Ok(JsonValue::Number(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<JsonValue, E> {
        Number::from_f64(v)
            .map(JsonValue::Number)
            .ok_or_else(|| E::custom("number out of range"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<JsonValue, E> {
        Ok(JsonValue::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<JsonValue, E> {
        Ok(JsonValue::String(v))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<JsonValue, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(StrictJson(item)) = seq.next_element::<StrictJson>()? {
            items.push(item);
        }
        Ok(JsonValue::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<JsonValue, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut object = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            if object.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate key {:?}", key)));
            }
            let StrictJson(value) = map.next_value::<StrictJson>()?;
            object.insert(key, value);
        }
        Ok(JsonValue::Object(object))
    }
}

fn json_type_name(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn type_mismatch(ty: &TypeDescriptor, found: &'static str, path: &Path) -> JsonError {
    JsonError::TypeMismatch {
        path: path.clone(),
        expected: ty.to_string(),
        found,
    }
}

fn invalid_text(expected: &'static str, text: &str, reason: impl ToString, path: &Path) -> JsonError {
    JsonError::InvalidText {
        path: path.clone(),
        expected,
        text: text.to_string(),
        reason: reason.to_string(),
    }
}

fn parse(json: &JsonValue, ty: &TypeDescriptor, nullable: bool, path: &Path) -> Result<Value, JsonError> {
    if json.is_null() {
        if nullable || matches!(ty, TypeDescriptor::Null) {
            return Ok(Value::Null);
        }
        return Err(type_mismatch(ty, "null", path));
    }
    let mismatch = || type_mismatch(ty, json_type_name(json), path);

    match ty {
        TypeDescriptor::Null => Err(mismatch()),
        TypeDescriptor::Bool => json.as_bool().map(Value::Bool).ok_or_else(mismatch),
        TypeDescriptor::Int8 => Ok(Value::Int8(parse_small_int(json, "int8", path, mismatch)?)),
        TypeDescriptor::Int16 => Ok(Value::Int16(parse_small_int(json, "int16", path, mismatch)?)),
        TypeDescriptor::Int32 => Ok(Value::Int32(parse_small_int(json, "int32", path, mismatch)?)),
        TypeDescriptor::Int64 => match json {
            JsonValue::Number(n) => n.as_i64().map(Value::Int64).ok_or_else(|| JsonError::OutOfRange {
                path: path.clone(),
                expected: "int64",
            }),
            JsonValue::String(s) => s
                .parse::<i64>()
                .map(Value::Int64)
                .map_err(|e| invalid_text("int64", s, e, path)),
            _ => Err(mismatch()),
        },
        TypeDescriptor::BigInt => match json {
            JsonValue::String(s) => s
                .parse::<BigInt>()
                .map(Value::BigInt)
                .map_err(|e| invalid_text("bigint", s, e, path)),
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => n
                .to_string()
                .parse::<BigInt>()
                .map(Value::BigInt)
                .map_err(|e| invalid_text("bigint", &n.to_string(), e, path)),
            _ => Err(mismatch()),
        },
        TypeDescriptor::Decimal => {
            let text = match json {
                JsonValue::String(s) => s.clone(),
                JsonValue::Number(n) => n.to_string(),
                _ => return Err(mismatch()),
            };
            text.parse::<Decimal>()
                .map(Value::Decimal)
                .map_err(|e| invalid_text("decimal", &text, e, path))
        }
        TypeDescriptor::Float32 => {
            let v = parse_float(json, "float32", path, mismatch)?;
            let narrowed = v as f32;
            if v.is_finite() && !narrowed.is_finite() {
                return Err(JsonError::OutOfRange {
                    path: path.clone(),
                    expected: "float32",
                });
            }
            Ok(Value::Float32(narrowed))
        }
        TypeDescriptor::Float64 => Ok(Value::Float64(parse_float(json, "float64", path, mismatch)?)),
        TypeDescriptor::String => json
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(mismatch),
        TypeDescriptor::Bytes => {
            let s = json.as_str().ok_or_else(mismatch)?;
            STANDARD
                .decode(s)
                .map(Value::Bytes)
                .map_err(|e| invalid_text("bytes", s, e, path))
        }
        TypeDescriptor::FixedBytes(size) => {
            let s = json.as_str().ok_or_else(mismatch)?;
            let bytes = STANDARD
                .decode(s)
                .map_err(|e| invalid_text("fixed_bytes", s, e, path))?;
            if bytes.len() != *size {
                return Err(invalid_text(
                    "fixed_bytes",
                    s,
                    format!("expected {} bytes, found {}", size, bytes.len()),
                    path,
                ));
            }
            Ok(Value::Bytes(bytes))
        }
        TypeDescriptor::Uuid => {
            let s = json.as_str().ok_or_else(mismatch)?;
            Uuid::parse_str(s)
                .map(Value::Uuid)
                .map_err(|e| invalid_text("uuid", s, e, path))
        }
        TypeDescriptor::Date => {
            let s = json.as_str().ok_or_else(mismatch)?;
            datetime::parse_date(s)
                .map(Value::Date)
                .map_err(|e| invalid_text("date", s, e, path))
        }
        TypeDescriptor::Time => {
            let s = json.as_str().ok_or_else(mismatch)?;
            datetime::parse_time(s)
                .map(Value::Time)
                .map_err(|e| invalid_text("time", s, e, path))
        }
        TypeDescriptor::DateTime => {
            let s = json.as_str().ok_or_else(mismatch)?;
            datetime::parse_datetime(s)
                .map(Value::DateTime)
                .map_err(|e| invalid_text("datetime", s, e, path))
        }
        TypeDescriptor::Duration => {
            let s = json.as_str().ok_or_else(mismatch)?;
            datetime::parse_duration(s)
                .map(Value::Duration)
                .map_err(|e| invalid_text("duration", s, e, path))
        }
        TypeDescriptor::Enum(enum_type) => parse_enum(json, enum_type, path, mismatch),
        TypeDescriptor::Object(object_type) => {
            let map = json.as_object().ok_or_else(mismatch)?;
            parse_object(map, object_type, path)
        }
        TypeDescriptor::Array(array_type) => {
            let items = json.as_array().ok_or_else(mismatch)?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    parse(
                        item,
                        &array_type.items,
                        array_type.item_constraints.nullable,
                        &path.index(i),
                    )
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        TypeDescriptor::Frame(frame_type) => {
            let map = json.as_object().ok_or_else(mismatch)?;
            parse_frame(map, frame_type, path)
        }
        TypeDescriptor::Ref(_) => Err(mismatch()),
    }
}

fn parse_small_int<T: TryFrom<i64>>(
    json: &JsonValue,
    expected: &'static str,
    path: &Path,
    mismatch: impl FnOnce() -> JsonError,
) -> Result<T, JsonError> {
    let JsonValue::Number(n) = json else {
        return Err(mismatch());
    };
    n.as_i64()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| JsonError::OutOfRange {
            path: path.clone(),
            expected,
        })
}

fn parse_float(
    json: &JsonValue,
    expected: &'static str,
    path: &Path,
    mismatch: impl FnOnce() -> JsonError,
) -> Result<f64, JsonError> {
    match json {
        JsonValue::Number(n) => n.as_f64().ok_or_else(|| JsonError::OutOfRange {
            path: path.clone(),
            expected,
        }),
        JsonValue::String(s) => match s.as_str() {
            NAN => Ok(f64::NAN),
            INFINITY => Ok(f64::INFINITY),
            NEG_INFINITY => Ok(f64::NEG_INFINITY),
            _ => Err(invalid_text(expected, s, "expected a number, NaN or Infinity", path)),
        },
        _ => Err(mismatch()),
    }
}

fn parse_enum(
    json: &JsonValue,
    enum_type: &EnumType,
    path: &Path,
    mismatch: impl FnOnce() -> JsonError,
) -> Result<Value, JsonError> {
    match json {
        JsonValue::String(name) => enum_type
            .discriminant_of(name)
            .map(Value::Enum)
            .ok_or_else(|| JsonError::UnknownEnumVariant {
                path: path.clone(),
                name: name.clone(),
            }),
        JsonValue::Number(n) => {
            let width: IntWidth = enum_type.width();
            n.as_i64()
                .filter(|d| width.contains(*d))
                .map(Value::Enum)
                .ok_or_else(|| JsonError::OutOfRange {
                    path: path.clone(),
                    expected: width.name(),
                })
        }
        _ => Err(mismatch()),
    }
}

fn parse_object(map: &Map<String, JsonValue>, ty: &ObjectType, path: &Path) -> Result<Value, JsonError> {
    let mut object = Object::with_capacity(map.len());
    for (key, json) in map {
        let field = ty.field(key).ok_or_else(|| JsonError::UnknownField {
            path: path.clone(),
            field: key.clone(),
        })?;
        let value = parse(json, &field.ty, field.constraints.nullable, &path.key(key))?;
        object.insert(key.clone(), value);
    }
    Ok(Value::Object(object))
}

fn frame_key<'a>(map: &'a Map<String, JsonValue>, key: &'static str, path: &Path) -> Result<&'a JsonValue, JsonError> {
    map.get(key).ok_or_else(|| JsonError::MissingFrameKey {
        path: path.clone(),
        key,
    })
}

fn parse_frame(map: &Map<String, JsonValue>, ty: &FrameType, path: &Path) -> Result<Value, JsonError> {
    let mismatch = |found: &'static str| JsonError::TypeMismatch {
        path: path.clone(),
        expected: "frame".to_string(),
        found,
    };

    if frame_key(map, FRAME_MARKER, path)?.as_bool() != Some(true) {
        return Err(mismatch("object"));
    }
    let rows_json = frame_key(map, "rows", path)?;
    let rows = rows_json
        .as_u64()
        .and_then(|r| usize::try_from(r).ok())
        .ok_or_else(|| mismatch(json_type_name(rows_json)))?;

    let names_json = frame_key(map, "columns", path)?;
    let names: Vec<&str> = names_json
        .as_array()
        .and_then(|names| names.iter().map(JsonValue::as_str).collect::<Option<Vec<_>>>())
        .ok_or_else(|| mismatch(json_type_name(names_json)))?;
    let expected: Vec<&str> = ty.columns.iter().map(|c| c.name.as_str()).collect();
    if names != expected {
        return Err(JsonError::ColumnMismatch {
            path: path.clone(),
            message: format!("expected {:?}, found {:?}", expected, names),
        });
    }

    let data_json = frame_key(map, "data", path)?;
    let data = data_json
        .as_object()
        .ok_or_else(|| mismatch(json_type_name(data_json)))?;
    if let Some(extra) = data.keys().find(|k| ty.column(k).is_none()) {
        return Err(JsonError::ColumnMismatch {
            path: path.clone(),
            message: format!("data has undeclared column {:?}", extra),
        });
    }

    let mut columns = Vec::with_capacity(ty.columns.len());
    for column in &ty.columns {
        let column_path = path.key(&column.name);
        let cells = data
            .get(&column.name)
            .and_then(JsonValue::as_array)
            .ok_or_else(|| JsonError::ColumnMismatch {
                path: path.clone(),
                message: format!("data has no array for column {:?}", column.name),
            })?;
        if cells.len() != rows {
            return Err(JsonError::ColumnLengthMismatch {
                path: path.clone(),
                column: column.name.clone(),
                expected: rows,
                found: cells.len(),
            });
        }
        let values = cells
            .iter()
            .enumerate()
            .map(|(row, cell)| parse(cell, &column.ty, column.constraints.nullable, &column_path.index(row)))
            .collect::<Result<Vec<_>, _>>()?;
        columns.push(FrameColumn::new(column.name.clone(), values));
    }

    Frame::new(rows, columns)
        .map(Value::Frame)
        .map_err(|e| JsonError::ColumnMismatch {
            path: path.clone(),
            message: e.to_string(),
        })
}
