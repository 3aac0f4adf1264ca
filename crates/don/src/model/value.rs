//! The in-memory value model.
//!
//! A [`Value`] is a tree: every value owns its children exclusively, so there
//! is no sharing and no back-references. Values are constructed by
//! application code or by a decoder and are treated as immutable afterwards;
//! the builder-style methods ([`Object::with`], [`Frame::with_column`])
//! consume the receiver and return a new value.

use std::fmt;

use uuid::Uuid;

use crate::error::FrameError;
use crate::model::number::{BigInt, Decimal};

/// Any DON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    BigInt(BigInt),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    /// Days since 1970-01-01.
    Date(i32),
    /// Microseconds since midnight (0 to 86,399,999,999).
    Time(i64),
    /// Microseconds since the Unix epoch, UTC.
    DateTime(i64),
    /// Signed span in microseconds.
    Duration(i64),
    /// Enum discriminant; the variant names live in the schema.
    Enum(i64),
    Object(Object),
    Array(Vec<Value>),
    Frame(Frame),
}

impl Value {
    /// Short lowercase name of this value's variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::BigInt(_) => "bigint",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Duration(_) => "duration",
            Value::Enum(_) => "enum",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Frame(_) => "frame",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the integer payload of any fixed-width integer variant.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(*v as i64),
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_frame(&self) -> Option<&Frame> {
        match self {
            Value::Frame(f) => Some(f),
            _ => None,
        }
    }

    /// A bounded, human-readable rendering for error messages.
    pub fn summary(&self) -> String {
        const MAX_CHARS: usize = 32;
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(v) => v.to_string(),
            Value::Int8(v) => v.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::BigInt(v) => v.to_string(),
            Value::Float32(v) => v.to_string(),
            Value::Float64(v) => v.to_string(),
            Value::Decimal(v) => v.to_string(),
            Value::String(s) => {
                if s.chars().count() > MAX_CHARS {
                    let preview: String = s.chars().take(MAX_CHARS).collect();
                    format!("{:?}...", preview)
                } else {
                    format!("{:?}", s)
                }
            }
            Value::Bytes(b) => format!("bytes[{}]", b.len()),
            Value::Uuid(u) => u.hyphenated().to_string(),
            Value::Date(d) => format!("date({})", d),
            Value::Time(t) => format!("time({})", t),
            Value::DateTime(t) => format!("datetime({})", t),
            Value::Duration(t) => format!("duration({})", t),
            Value::Enum(d) => format!("enum({})", d),
            Value::Object(o) => format!("object{{{} keys}}", o.len()),
            Value::Array(a) => format!("array[{}]", a.len()),
            Value::Frame(f) => format!("frame[{} rows x {} columns]", f.row_count(), f.column_count()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::BigInt(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::Object(v)
    }
}

impl From<Frame> for Value {
    fn from(v: Frame) -> Self {
        Value::Frame(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

// =============================================================================
// OBJECT
// =============================================================================

/// Ordered string-keyed mapping with unique keys.
///
/// Iteration follows insertion order, but equality is mapping equality: two
/// objects with the same entries compare equal whatever their key order.
#[derive(Debug, Clone, Default)]
pub struct Object {
    entries: Vec<(String, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Returns a new object with `key` set to `value`.
    ///
    /// An existing key keeps its position and has its value replaced.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets `key` to `value`, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in ascending UTF-8 byte order of their keys.
    pub fn sorted_entries(&self) -> Vec<(&str, &Value)> {
        let mut entries: Vec<(&str, &Value)> = self.iter().collect();
        entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        entries
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(key, value)| other.get(key) == Some(value))
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (k, v) in iter {
            object.insert(k, v);
        }
        object
    }
}

impl IntoIterator for Object {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// =============================================================================
// FRAME
// =============================================================================

/// One named column of a frame; absent cells are [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameColumn {
    name: String,
    values: Vec<Value>,
}

impl FrameColumn {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn has_nulls(&self) -> bool {
        self.values.iter().any(Value::is_null)
    }

    pub(crate) fn into_parts(self) -> (String, Vec<Value>) {
        (self.name, self.values)
    }
}

/// Columnar table: a row count plus named columns stored column-major.
///
/// Every column holds exactly `row_count` values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    row_count: usize,
    columns: Vec<FrameColumn>,
}

impl Frame {
    /// Creates a frame, checking the row-length invariant and column name uniqueness.
    pub fn new(row_count: usize, columns: Vec<FrameColumn>) -> Result<Self, FrameError> {
        for (i, column) in columns.iter().enumerate() {
            if column.len() != row_count {
                return Err(FrameError::LengthMismatch {
                    column: column.name.clone(),
                    expected: row_count,
                    found: column.len(),
                });
            }
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(FrameError::DuplicateColumn {
                    name: column.name.clone(),
                });
            }
        }
        Ok(Self { row_count, columns })
    }

    /// Creates a frame whose row count is taken from its first column.
    pub fn from_columns(columns: Vec<FrameColumn>) -> Result<Self, FrameError> {
        let row_count = columns.first().map(FrameColumn::len).unwrap_or(0);
        Self::new(row_count, columns)
    }

    /// Returns a new frame with one more column appended.
    ///
    /// A frame without columns adopts the new column's length as its row count.
    pub fn with_column(self, name: impl Into<String>, values: Vec<Value>) -> Result<Self, FrameError> {
        let row_count = if self.columns.is_empty() {
            values.len()
        } else {
            self.row_count
        };
        let mut columns = self.columns;
        columns.push(FrameColumn::new(name, values));
        Self::new(row_count, columns)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[FrameColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&FrameColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub(crate) fn into_parts(self) -> (usize, Vec<FrameColumn>) {
        (self.row_count, self.columns)
    }

    /// Reassembles a frame whose columns were taken apart with
    /// [`Frame::into_parts`] and rebuilt at the same lengths.
    pub(crate) fn from_parts(row_count: usize, columns: Vec<FrameColumn>) -> Frame {
        Frame { row_count, columns }
    }

    /// Returns a frame whose row `i` is row `order[i]` of this frame.
    pub(crate) fn permute_rows(&self, order: &[usize]) -> Frame {
        let columns = self
            .columns
            .iter()
            .map(|c| FrameColumn {
                name: c.name.clone(),
                values: order.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect();
        Frame {
            row_count: order.len(),
            columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_insert_keeps_position() {
        let obj = Object::new().with("b", 1).with("a", 2).with("b", 3);
        let keys: Vec<&str> = obj.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(obj.get("b"), Some(&Value::Int32(3)));
        assert_eq!(obj.len(), 2);
    }

    #[test]
    fn test_object_equality_ignores_key_order() {
        let ab = Object::new().with("a", 1).with("b", "x");
        let ba = Object::new().with("b", "x").with("a", 1);
        assert_eq!(ab, ba);
        assert_eq!(Value::Object(ab.clone()), Value::Object(ba));
        assert_ne!(ab, Object::new().with("a", 1).with("b", "y"));
        assert_ne!(ab, Object::new().with("a", 1));
        assert_ne!(ab, Object::new().with("a", 1).with("c", "x"));
    }

    #[test]
    fn test_object_sorted_entries_by_bytes() {
        let obj = Object::new().with("é", 1).with("z", 2).with("A", 3);
        let keys: Vec<&str> = obj.sorted_entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["A", "z", "é"]);
    }

    #[test]
    fn test_frame_length_invariant() {
        let result = Frame::new(
            2,
            vec![
                FrameColumn::new("a", vec![Value::Int32(1), Value::Int32(2)]),
                FrameColumn::new("b", vec![Value::Int32(1)]),
            ],
        );
        assert!(matches!(
            result,
            Err(FrameError::LengthMismatch { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn test_frame_duplicate_column() {
        let result = Frame::default()
            .with_column("a", vec![Value::Null])
            .and_then(|f| f.with_column("a", vec![Value::Null]));
        assert!(matches!(result, Err(FrameError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_frame_with_column_adopts_row_count() {
        let frame = Frame::default()
            .with_column("id", vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)])
            .unwrap();
        assert_eq!(frame.row_count(), 3);
        assert!(frame.clone().with_column("x", vec![Value::Null]).is_err());
    }

    #[test]
    fn test_frame_permute_rows() {
        let frame = Frame::from_columns(vec![
            FrameColumn::new("k", vec![Value::Int32(3), Value::Int32(1), Value::Int32(2)]),
            FrameColumn::new("v", vec!["c".into(), "a".into(), "b".into()]),
        ])
        .unwrap();
        let permuted = frame.permute_rows(&[1, 2, 0]);
        assert_eq!(
            permuted.column("v").unwrap().values(),
            &[Value::from("a"), Value::from("b"), Value::from("c")]
        );
    }

    #[test]
    fn test_summary_truncates() {
        let long = Value::String("x".repeat(100));
        assert!(long.summary().ends_with("..."));
        assert_eq!(Value::Bytes(vec![0; 4]).summary(), "bytes[4]");
    }
}
