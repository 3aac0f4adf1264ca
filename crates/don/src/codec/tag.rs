//! Wire type tags.
//!
//! Every non-cell value on the wire starts with a one-byte tag. The low seven
//! bits name the type; bit 7 marks the varint-packed integer form and is only
//! legal on the four fixed-width integer tags.

use crate::error::DecodeError;
use crate::model::schema::TypeDescriptor;
use crate::model::value::Value;

/// Bit 7 of a tag byte: integer payload is a zigzag varint instead of fixed-width LE.
pub const PACKED_FLAG: u8 = 0x80;

/// Type tag (low seven bits of the tag byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    Null = 0x00,
    Bool = 0x01,
    Int8 = 0x02,
    Int16 = 0x03,
    Int32 = 0x04,
    Int64 = 0x05,
    BigInt = 0x06,
    Float32 = 0x07,
    Float64 = 0x08,
    Decimal = 0x09,
    String = 0x0A,
    Bytes = 0x0B,
    FixedBytes = 0x0C,
    Uuid = 0x0D,
    Date = 0x0E,
    Time = 0x0F,
    DateTime = 0x10,
    Duration = 0x11,
    Enum = 0x12,
    Object = 0x13,
    Array = 0x14,
    Frame = 0x15,
}

impl TypeTag {
    /// Creates a TypeTag from its wire representation.
    pub fn from_u8(v: u8) -> Option<TypeTag> {
        Some(match v {
            0x00 => TypeTag::Null,
            0x01 => TypeTag::Bool,
            0x02 => TypeTag::Int8,
            0x03 => TypeTag::Int16,
            0x04 => TypeTag::Int32,
            0x05 => TypeTag::Int64,
            0x06 => TypeTag::BigInt,
            0x07 => TypeTag::Float32,
            0x08 => TypeTag::Float64,
            0x09 => TypeTag::Decimal,
            0x0A => TypeTag::String,
            0x0B => TypeTag::Bytes,
            0x0C => TypeTag::FixedBytes,
            0x0D => TypeTag::Uuid,
            0x0E => TypeTag::Date,
            0x0F => TypeTag::Time,
            0x10 => TypeTag::DateTime,
            0x11 => TypeTag::Duration,
            0x12 => TypeTag::Enum,
            0x13 => TypeTag::Object,
            0x14 => TypeTag::Array,
            0x15 => TypeTag::Frame,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Bool => "bool",
            TypeTag::Int8 => "int8",
            TypeTag::Int16 => "int16",
            TypeTag::Int32 => "int32",
            TypeTag::Int64 => "int64",
            TypeTag::BigInt => "bigint",
            TypeTag::Float32 => "float32",
            TypeTag::Float64 => "float64",
            TypeTag::Decimal => "decimal",
            TypeTag::String => "string",
            TypeTag::Bytes => "bytes",
            TypeTag::FixedBytes => "fixed_bytes",
            TypeTag::Uuid => "uuid",
            TypeTag::Date => "date",
            TypeTag::Time => "time",
            TypeTag::DateTime => "datetime",
            TypeTag::Duration => "duration",
            TypeTag::Enum => "enum",
            TypeTag::Object => "object",
            TypeTag::Array => "array",
            TypeTag::Frame => "frame",
        }
    }

    /// Returns true for the fixed-width integer tags, the only ones that may be packed.
    pub fn is_fixed_int(self) -> bool {
        matches!(self, TypeTag::Int8 | TypeTag::Int16 | TypeTag::Int32 | TypeTag::Int64)
    }

    /// Compound values are written tagged even inside frame columns.
    pub fn is_compound(self) -> bool {
        matches!(self, TypeTag::Object | TypeTag::Array | TypeTag::Frame)
    }

    /// The tag a schema type is written under. `None` for unresolved references.
    pub fn for_type(ty: &TypeDescriptor) -> Option<TypeTag> {
        Some(match ty {
            TypeDescriptor::Null => TypeTag::Null,
            TypeDescriptor::Bool => TypeTag::Bool,
            TypeDescriptor::Int8 => TypeTag::Int8,
            TypeDescriptor::Int16 => TypeTag::Int16,
            TypeDescriptor::Int32 => TypeTag::Int32,
            TypeDescriptor::Int64 => TypeTag::Int64,
            TypeDescriptor::BigInt => TypeTag::BigInt,
            TypeDescriptor::Float32 => TypeTag::Float32,
            TypeDescriptor::Float64 => TypeTag::Float64,
            TypeDescriptor::Decimal => TypeTag::Decimal,
            TypeDescriptor::String => TypeTag::String,
            TypeDescriptor::Bytes => TypeTag::Bytes,
            TypeDescriptor::FixedBytes(_) => TypeTag::FixedBytes,
            TypeDescriptor::Uuid => TypeTag::Uuid,
            TypeDescriptor::Date => TypeTag::Date,
            TypeDescriptor::Time => TypeTag::Time,
            TypeDescriptor::DateTime => TypeTag::DateTime,
            TypeDescriptor::Duration => TypeTag::Duration,
            TypeDescriptor::Enum(_) => TypeTag::Enum,
            TypeDescriptor::Object(_) => TypeTag::Object,
            TypeDescriptor::Array(_) => TypeTag::Array,
            TypeDescriptor::Frame(_) => TypeTag::Frame,
            TypeDescriptor::Ref(_) => return None,
        })
    }

    /// The tag a value is written under without a schema.
    pub fn of(value: &Value) -> TypeTag {
        match value {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Bool,
            Value::Int8(_) => TypeTag::Int8,
            Value::Int16(_) => TypeTag::Int16,
            Value::Int32(_) => TypeTag::Int32,
            Value::Int64(_) => TypeTag::Int64,
            Value::BigInt(_) => TypeTag::BigInt,
            Value::Float32(_) => TypeTag::Float32,
            Value::Float64(_) => TypeTag::Float64,
            Value::Decimal(_) => TypeTag::Decimal,
            Value::String(_) => TypeTag::String,
            Value::Bytes(_) => TypeTag::Bytes,
            Value::Uuid(_) => TypeTag::Uuid,
            Value::Date(_) => TypeTag::Date,
            Value::Time(_) => TypeTag::Time,
            Value::DateTime(_) => TypeTag::DateTime,
            Value::Duration(_) => TypeTag::Duration,
            Value::Enum(_) => TypeTag::Enum,
            Value::Object(_) => TypeTag::Object,
            Value::Array(_) => TypeTag::Array,
            Value::Frame(_) => TypeTag::Frame,
        }
    }
}

/// A decoded tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireTag {
    pub tag: TypeTag,
    /// Integer payload is a zigzag varint.
    pub packed: bool,
}

impl WireTag {
    pub fn plain(tag: TypeTag) -> Self {
        Self { tag, packed: false }
    }

    /// Packs integer tags; other tags are returned plain.
    pub fn packed(tag: TypeTag) -> Self {
        Self {
            tag,
            packed: tag.is_fixed_int(),
        }
    }

    pub fn to_byte(self) -> u8 {
        if self.packed {
            self.tag as u8 | PACKED_FLAG
        } else {
            self.tag as u8
        }
    }

    /// Parses a tag byte read at `offset`.
    pub fn from_byte(byte: u8, offset: usize) -> Result<Self, DecodeError> {
        let packed = byte & PACKED_FLAG != 0;
        let tag = TypeTag::from_u8(byte & !PACKED_FLAG).ok_or(DecodeError::InvalidTag { tag: byte, offset })?;
        if packed && !tag.is_fixed_int() {
            return Err(DecodeError::InvalidTag { tag: byte, offset });
        }
        Ok(Self { tag, packed })
    }
}
