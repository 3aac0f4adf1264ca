//! Error types for schema construction, validation, encoding and decoding.
//!
//! The three core kinds are never conflated:
//! - [`SchemaError`]: the schema itself is inconsistent (construction time)
//! - [`ValidationError`]: a value violates its schema (recoverable)
//! - [`DecodeError`]: the byte stream is malformed (fatal to that decode)
//!
//! [`EncodeError`] and [`JsonError`] cover values that cannot be laid out on
//! the wire, and JSON text that does not match its schema. [`FrameError`]
//! guards the frame length invariant at construction.

use std::fmt;

use thiserror::Error;

// =============================================================================
// PATHS
// =============================================================================

/// One step from a parent value to a child.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object field or frame column name.
    Key(String),
    /// Array element or frame row index.
    Index(usize),
    /// Any array element (used for schema locations).
    Element,
}

/// Location of a value inside a tree, rendered as `$.users[3].name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    /// The root path (`$`).
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a new path with a key step appended.
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(key.to_string()));
        Self { segments }
    }

    /// Returns a new path with an index step appended.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    /// Returns a new path with an "any element" step appended.
    pub fn element(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Element);
        Self { segments }
    }

    /// The steps from the root, in order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns true for the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) => write!(f, ".{}", key)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
                PathSegment::Element => write!(f, "[*]")?,
            }
        }
        Ok(())
    }
}

// =============================================================================
// SCHEMA ERRORS
// =============================================================================

/// The schema is internally inconsistent. Raised once, at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("{path}: min {min} is greater than max {max}")]
    MinGreaterThanMax { path: Path, min: String, max: String },

    #[error("{path}: min_length {min} is greater than max_length {max}")]
    MinLengthGreaterThanMaxLength { path: Path, min: usize, max: usize },

    #[error("{path}: min_items {min} is greater than max_items {max}")]
    MinItemsGreaterThanMaxItems { path: Path, min: usize, max: usize },

    #[error("{path}: bound {found} does not match field type {expected}")]
    BoundTypeMismatch {
        path: Path,
        expected: String,
        found: &'static str,
    },

    #[error("{path}: constraint `{constraint}` does not apply to type {ty}")]
    InapplicableConstraint {
        path: Path,
        constraint: &'static str,
        ty: String,
    },

    #[error("{path}: duplicate name {name:?}")]
    DuplicateName { path: Path, name: String },

    #[error("{path}: duplicate enum discriminant {discriminant}")]
    DuplicateDiscriminant { path: Path, discriminant: i64 },

    #[error("{path}: enum discriminant {discriminant} does not fit in {width}")]
    DiscriminantOutOfRange {
        path: Path,
        discriminant: i64,
        width: &'static str,
    },

    #[error("{path}: invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        path: Path,
        pattern: String,
        reason: String,
    },

    #[error("{path}: fixed_bytes size must be at least 1")]
    ZeroFixedSize { path: Path },

    #[error("cyclic type reference: {}", cycle.join(" -> "))]
    CyclicReference { cycle: Vec<String> },

    #[error("unresolved type reference {name:?}")]
    UnresolvedReference { name: String },

    #[error("type {name:?} is defined more than once")]
    DuplicateDefinition { name: String },
}

// =============================================================================
// VALIDATION ERRORS
// =============================================================================

/// What kind of rule a [`ValidationError`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    TypeMismatch,
    NullNotAllowed,
    MissingField,
    UnknownField,
    UnknownEnumVariant,
    BelowMinimum,
    AboveMaximum,
    TooShort,
    TooLong,
    TooFewItems,
    TooManyItems,
    PatternMismatch,
    Duplicate,
    NotSorted,
    ColumnMismatch,
}

/// A value failed a schema-declared type check or constraint.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{path}: {message}")]
pub struct ValidationError {
    /// Where the failing value sits, from the root.
    pub path: Path,
    pub kind: ValidationErrorKind,
    /// The expected type or constraint, rendered.
    pub expected: String,
    /// A safe summary of the offending value.
    pub actual: String,
    pub message: String,
}

// =============================================================================
// DECODE ERRORS
// =============================================================================

/// Coarse classification of decode failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// D001: bad magic or unsupported version
    InvalidHeader,
    /// D002: input ended early or a length prefix overruns it
    Truncated,
    /// D003: invalid UTF-8
    InvalidUtf8,
    /// D004: wire data disagrees with the schema
    SchemaMismatch,
    /// D005: malformed varint/tag/reserved bits/encoding
    MalformedEncoding,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "D001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::InvalidHeader => "D001",
            ErrorCode::Truncated => "D002",
            ErrorCode::InvalidUtf8 => "D003",
            ErrorCode::SchemaMismatch => "D004",
            ErrorCode::MalformedEncoding => "D005",
        }
    }
}

/// The byte stream is structurally malformed.
///
/// Every variant carries the byte offset at which the fault was detected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    // === D001 ===
    #[error("[D001] invalid magic bytes {found:?} at offset {offset}")]
    InvalidMagic { found: Vec<u8>, offset: usize },

    #[error("[D001] unsupported version {version} at offset {offset}")]
    UnsupportedVersion { version: u8, offset: usize },

    // === D002 ===
    #[error("[D002] unexpected end of input while reading {context} at offset {offset}")]
    UnexpectedEof { context: &'static str, offset: usize },

    #[error("[D002] {field} length {len} exceeds the {remaining} remaining bytes at offset {offset}")]
    LengthExceedsBuffer {
        field: &'static str,
        len: usize,
        remaining: usize,
        offset: usize,
    },

    // === D003 ===
    #[error("[D003] invalid UTF-8 in {field} at offset {offset}")]
    InvalidUtf8 { field: &'static str, offset: usize },

    // === D004 ===
    #[error("[D004] expected {expected} but found tag 0x{found:02x} at offset {offset}")]
    TagMismatch {
        expected: &'static str,
        found: u8,
        offset: usize,
    },

    #[error("[D004] {context} at offset {offset}: expected {expected:?}, found {found:?}")]
    ColumnMismatch {
        context: &'static str,
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("[D004] null bitmap present on non-nullable column {column:?} at offset {offset}")]
    UnexpectedNullBitmap { column: String, offset: usize },

    #[error("[D004] fixed_bytes size {found} does not match declared {expected} at offset {offset}")]
    FixedSizeMismatch {
        expected: usize,
        found: usize,
        offset: usize,
    },

    #[error("[D004] integer does not fit in {width} at offset {offset}")]
    IntegerOutOfRange { width: &'static str, offset: usize },

    #[error("[D004] object key {key:?} is not declared in the schema at offset {offset}")]
    UnknownField { key: String, offset: usize },

    #[error("[D004] required field {field:?} is absent from object at offset {offset}")]
    MissingField { field: String, offset: usize },

    // === D005 ===
    #[error("[D005] varint exceeds maximum length (10 bytes) at offset {offset}")]
    VarintTooLong { offset: usize },

    #[error("[D005] varint overflow (value exceeds u64) at offset {offset}")]
    VarintOverflow { offset: usize },

    #[error("[D005] {field} length {len} exceeds maximum {max} at offset {offset}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
        offset: usize,
    },

    #[error("[D005] invalid type tag 0x{tag:02x} at offset {offset}")]
    InvalidTag { tag: u8, offset: usize },

    #[error("[D005] invalid bool value {value} (expected 0x00 or 0x01) at offset {offset}")]
    InvalidBool { value: u8, offset: usize },

    #[error("[D005] reserved bits are non-zero in {context} at offset {offset}")]
    ReservedBitsSet { context: &'static str, offset: usize },

    #[error("[D005] {context} is not in canonical form at offset {offset}")]
    NotCanonical { context: &'static str, offset: usize },

    #[error("[D005] {context} out of range at offset {offset}")]
    OutOfRange { context: &'static str, offset: usize },

    #[error("[D005] duplicate object key {key:?} at offset {offset}")]
    DuplicateKey { key: String, offset: usize },

    #[error("[D005] duplicate frame column {name:?} at offset {offset}")]
    DuplicateColumn { name: String, offset: usize },

    #[error("[D005] nesting deeper than {max} at offset {offset}")]
    DepthExceeded { max: usize, offset: usize },

    #[error("[D005] {count} trailing bytes after the root value at offset {offset}")]
    TrailingBytes { count: usize, offset: usize },
}

impl DecodeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::InvalidMagic { .. } | DecodeError::UnsupportedVersion { .. } => {
                ErrorCode::InvalidHeader
            }
            DecodeError::UnexpectedEof { .. } | DecodeError::LengthExceedsBuffer { .. } => {
                ErrorCode::Truncated
            }
            DecodeError::InvalidUtf8 { .. } => ErrorCode::InvalidUtf8,
            DecodeError::TagMismatch { .. }
            | DecodeError::ColumnMismatch { .. }
            | DecodeError::UnexpectedNullBitmap { .. }
            | DecodeError::FixedSizeMismatch { .. }
            | DecodeError::IntegerOutOfRange { .. }
            | DecodeError::UnknownField { .. }
            | DecodeError::MissingField { .. } => ErrorCode::SchemaMismatch,
            _ => ErrorCode::MalformedEncoding,
        }
    }

    /// Byte offset at which the inconsistency was detected.
    pub fn offset(&self) -> usize {
        match self {
            DecodeError::InvalidMagic { offset, .. }
            | DecodeError::UnsupportedVersion { offset, .. }
            | DecodeError::UnexpectedEof { offset, .. }
            | DecodeError::LengthExceedsBuffer { offset, .. }
            | DecodeError::InvalidUtf8 { offset, .. }
            | DecodeError::TagMismatch { offset, .. }
            | DecodeError::ColumnMismatch { offset, .. }
            | DecodeError::UnexpectedNullBitmap { offset, .. }
            | DecodeError::FixedSizeMismatch { offset, .. }
            | DecodeError::IntegerOutOfRange { offset, .. }
            | DecodeError::UnknownField { offset, .. }
            | DecodeError::MissingField { offset, .. }
            | DecodeError::VarintTooLong { offset }
            | DecodeError::VarintOverflow { offset }
            | DecodeError::LengthExceedsLimit { offset, .. }
            | DecodeError::InvalidTag { offset, .. }
            | DecodeError::InvalidBool { offset, .. }
            | DecodeError::ReservedBitsSet { offset, .. }
            | DecodeError::NotCanonical { offset, .. }
            | DecodeError::OutOfRange { offset, .. }
            | DecodeError::DuplicateKey { offset, .. }
            | DecodeError::DuplicateColumn { offset, .. }
            | DecodeError::DepthExceeded { offset, .. }
            | DecodeError::TrailingBytes { offset, .. } => *offset,
        }
    }
}

// =============================================================================
// ENCODE ERRORS
// =============================================================================

/// A value cannot be laid out on the wire under the given schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: Path,
        expected: String,
        found: &'static str,
    },

    #[error("{path}: fixed_bytes expects {expected} bytes, found {found}")]
    FixedSizeMismatch {
        path: Path,
        expected: usize,
        found: usize,
    },

    #[error("{path}: null where the schema does not allow it")]
    UnexpectedNull { path: Path },

    #[error("{path}: field {field:?} is not declared in the schema")]
    UnknownField { path: Path, field: String },

    #[error("{path}: required field {field:?} is missing")]
    MissingField { path: Path, field: String },

    #[error("{path}: frame columns do not match the schema: {message}")]
    ColumnMismatch { path: Path, message: String },

    #[error("{path}: column mixes {first} and {other} values")]
    HeterogeneousColumn {
        path: Path,
        first: &'static str,
        other: &'static str,
    },

    #[error("{path}: {context} out of range")]
    OutOfRange { path: Path, context: &'static str },

    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

// =============================================================================
// FRAME CONSTRUCTION ERRORS
// =============================================================================

/// A frame value would violate its own structural invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("column {column:?} has {found} values, frame has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("duplicate column {name:?}")]
    DuplicateColumn { name: String },
}

// =============================================================================
// JSON ERRORS
// =============================================================================

/// JSON text is malformed or does not match the schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JsonError {
    #[error("invalid JSON: {0}")]
    Syntax(String),

    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: Path,
        expected: String,
        found: &'static str,
    },

    #[error("{path}: invalid {expected} text {text:?}: {reason}")]
    InvalidText {
        path: Path,
        expected: &'static str,
        text: String,
        reason: String,
    },

    #[error("{path}: {expected} value out of range")]
    OutOfRange { path: Path, expected: &'static str },

    #[error("{path}: field {field:?} is not declared in the schema")]
    UnknownField { path: Path, field: String },

    #[error("{path}: unknown enum variant {name:?}")]
    UnknownEnumVariant { path: Path, name: String },

    #[error("{path}: frame object is missing key {key:?}")]
    MissingFrameKey { path: Path, key: &'static str },

    #[error("{path}: frame columns do not match the schema: {message}")]
    ColumnMismatch { path: Path, message: String },

    #[error("{path}: column {column:?} has {found} values, frame has {expected} rows")]
    ColumnLengthMismatch {
        path: Path,
        column: String,
        expected: usize,
        found: usize,
    },
}

impl From<serde_json::Error> for JsonError {
    fn from(err: serde_json::Error) -> Self {
        JsonError::Syntax(err.to_string())
    }
}
