//! Message envelope: header, flags and the top-level encode/decode entry points.
//!
//! ```text
//! message := "DONB" version:u8 flags:u8 root
//! root    := tag:u8 payload
//! ```
//!
//! No schema identifier is embedded; the reader supplies the schema (or
//! decodes dynamically).

use tracing::{debug, trace};

use crate::codec::primitives::{Reader, Writer};
use crate::codec::value::{decode_dynamic_value, decode_value, encode_dynamic_value, encode_value};
use crate::error::{DecodeError, EncodeError, Path};
use crate::limits::{FLAG_DETERMINISTIC, FORMAT_VERSION, MAGIC};
use crate::model::schema::Schema;
use crate::model::value::Value;

/// Options for encoding messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Enable deterministic encoding mode.
    ///
    /// When enabled:
    /// - Object keys are written in ascending UTF-8 byte order
    /// - Frame rows are stably reordered by the first `sorted` column
    /// - NaN floats are written as the quiet-NaN bit pattern
    ///
    /// Equal values under the same schema then produce identical bytes,
    /// which is what content hashing relies on.
    pub deterministic: bool,
}

impl EncodeOptions {
    /// Creates default (non-deterministic) encoding options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates deterministic encoding options.
    pub fn deterministic() -> Self {
        Self { deterministic: true }
    }
}

/// Parsed message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    /// The writer used deterministic mode.
    pub deterministic: bool,
}

fn write_header(writer: &mut Writer, options: EncodeOptions) {
    writer.write_bytes(MAGIC);
    writer.write_byte(FORMAT_VERSION);
    writer.write_byte(if options.deterministic { FLAG_DETERMINISTIC } else { 0 });
}

fn read_header(reader: &mut Reader<'_>) -> Result<Header, DecodeError> {
    let magic = reader.read_bytes(MAGIC.len(), "magic")?;
    if magic != MAGIC {
        return Err(DecodeError::InvalidMagic {
            found: magic.to_vec(),
            offset: 0,
        });
    }
    let version_offset = reader.position();
    let version = reader.read_byte("version")?;
    if version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            version,
            offset: version_offset,
        });
    }
    // Reserved flag bits are ignored on read
    let flags = reader.read_byte("flags")?;
    Ok(Header {
        version,
        deterministic: flags & FLAG_DETERMINISTIC != 0,
    })
}

/// Reads and checks the header of a message without decoding its body.
pub fn peek_header(input: &[u8]) -> Result<Header, DecodeError> {
    read_header(&mut Reader::new(input))
}

fn finish(reader: &Reader<'_>) -> Result<(), DecodeError> {
    if !reader.is_empty() {
        return Err(DecodeError::TrailingBytes {
            count: reader.remaining_len(),
            offset: reader.position(),
        });
    }
    Ok(())
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes `value` under `schema`.
///
/// Integers are written at the width the schema pins. The value must match
/// the schema's wire layout; constraints are not checked here (see
/// [`crate::validate`]).
pub fn encode(value: &Value, schema: &Schema, options: EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Writer::with_capacity(256);
    write_header(&mut writer, options);
    encode_value(
        &mut writer,
        value,
        schema.root(),
        schema.constraints().nullable,
        options.deterministic,
        &Path::root(),
    )?;
    debug!(
        bytes = writer.len(),
        deterministic = options.deterministic,
        root = value.type_name(),
        "encoded message"
    );
    Ok(writer.into_bytes())
}

/// Encodes `value` without a schema. Integers are written as zigzag varints.
pub fn encode_dynamic(value: &Value, options: EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Writer::with_capacity(256);
    write_header(&mut writer, options);
    encode_dynamic_value(&mut writer, value, options.deterministic, &Path::root())?;
    debug!(
        bytes = writer.len(),
        deterministic = options.deterministic,
        root = value.type_name(),
        "encoded dynamic message"
    );
    Ok(writer.into_bytes())
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes a message under `schema`.
///
/// The header is checked before anything else. Decoding never returns a
/// partial value: any fault yields a [`DecodeError`] carrying its offset.
pub fn decode(input: &[u8], schema: &Schema) -> Result<Value, DecodeError> {
    let mut reader = Reader::new(input);
    let header = read_header(&mut reader)?;
    trace!(deterministic = header.deterministic, "message header");
    let value = decode_value(&mut reader, schema.root(), schema.constraints().nullable, 0)?;
    finish(&reader)?;
    debug!(bytes = input.len(), root = value.type_name(), "decoded message");
    Ok(value)
}

/// Decodes any message without a schema.
///
/// Integers come back at the width named by their tags; `fixed_bytes` values
/// come back as plain bytes.
pub fn decode_dynamic(input: &[u8]) -> Result<Value, DecodeError> {
    let mut reader = Reader::new(input);
    let header = read_header(&mut reader)?;
    trace!(deterministic = header.deterministic, "message header");
    let value = decode_dynamic_value(&mut reader, 0)?;
    finish(&reader)?;
    debug!(bytes = input.len(), root = value.type_name(), "decoded dynamic message");
    Ok(value)
}
