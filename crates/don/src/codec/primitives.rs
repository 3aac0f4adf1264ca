//! Primitive encoding/decoding for the DON binary format.
//!
//! Implements varint, signed varint (zigzag), fixed-width little-endian
//! numbers and length-prefixed framing.

use crate::error::DecodeError;
use crate::limits::MAX_VARINT_BYTES;

// =============================================================================
// DECODING
// =============================================================================

/// Reader for decoding binary data.
///
/// Wraps a byte slice and provides methods for reading primitives
/// with bounds checking. Every error carries the offset it was raised at.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position in the data.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of remaining bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        if self.pos >= self.data.len() {
            return Err(DecodeError::UnexpectedEof {
                context,
                offset: self.pos,
            });
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Reads the next byte without consuming it.
    #[inline]
    pub fn peek_byte(&self, context: &'static str) -> Result<u8, DecodeError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEof {
                context,
                offset: self.pos,
            })
    }

    /// Reads exactly n bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining_len() {
            return Err(DecodeError::UnexpectedEof {
                context,
                offset: self.pos,
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Reads exactly N bytes into an array.
    #[inline]
    pub fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N, context)?);
        Ok(out)
    }

    /// Reads an unsigned varint (LEB128).
    #[inline]
    pub fn read_varint(&mut self, context: &'static str) -> Result<u64, DecodeError> {
        let start = self.pos;
        let mut result: u64 = 0;
        let mut shift = 0;

        for _ in 0..MAX_VARINT_BYTES {
            let byte = self.read_byte(context)?;
            let value = (byte & 0x7F) as u64;

            if shift == 63 && value > 1 {
                return Err(DecodeError::VarintOverflow { offset: start });
            }

            result |= value << shift;

            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }

        Err(DecodeError::VarintTooLong { offset: start })
    }

    /// Reads a signed varint (zigzag encoded).
    pub fn read_signed_varint(&mut self, context: &'static str) -> Result<i64, DecodeError> {
        let unsigned = self.read_varint(context)?;
        Ok(zigzag_decode(unsigned))
    }

    /// Reads a varint length and checks it against `max` and the remaining input.
    pub fn read_length(&mut self, max: usize, field: &'static str) -> Result<usize, DecodeError> {
        let offset = self.pos;
        let len = self.read_count(max, field)?;
        if len > self.remaining_len() {
            return Err(DecodeError::LengthExceedsBuffer {
                field,
                len,
                remaining: self.remaining_len(),
                offset,
            });
        }
        Ok(len)
    }

    /// Reads a varint element count and checks it against `max`.
    pub fn read_count(&mut self, max: usize, field: &'static str) -> Result<usize, DecodeError> {
        let offset = self.pos;
        let raw = self.read_varint(field)?;
        match usize::try_from(raw) {
            Ok(len) if len <= max => Ok(len),
            _ => Err(DecodeError::LengthExceedsLimit {
                field,
                len: usize::try_from(raw).unwrap_or(usize::MAX),
                max,
                offset,
            }),
        }
    }

    /// Reads an element count whose elements each take at least `min_item_len` bytes.
    ///
    /// Rejects counts the remaining input cannot possibly hold, before any allocation.
    pub fn read_collection_len(
        &mut self,
        max: usize,
        min_item_len: usize,
        field: &'static str,
    ) -> Result<usize, DecodeError> {
        let offset = self.pos;
        let count = self.read_count(max, field)?;
        if count.saturating_mul(min_item_len) > self.remaining_len() {
            return Err(DecodeError::LengthExceedsBuffer {
                field,
                len: count,
                remaining: self.remaining_len(),
                offset,
            });
        }
        Ok(count)
    }

    /// Reads a length-prefixed UTF-8 string.
    #[inline]
    pub fn read_string(&mut self, max_len: usize, field: &'static str) -> Result<String, DecodeError> {
        let len = self.read_length(max_len, field)?;
        let offset = self.pos;
        let bytes = self.read_bytes(len, field)?;
        // Validate UTF-8 on borrowed slice, then allocate once
        std::str::from_utf8(bytes)
            .map(|s| s.to_string())
            .map_err(|_| DecodeError::InvalidUtf8 { field, offset })
    }

    /// Reads a length-prefixed byte array.
    pub fn read_bytes_prefixed(&mut self, max_len: usize, field: &'static str) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_length(max_len, field)?;
        let bytes = self.read_bytes(len, field)?;
        Ok(bytes.to_vec())
    }

    #[inline]
    pub fn read_i8(&mut self, context: &'static str) -> Result<i8, DecodeError> {
        Ok(i8::from_le_bytes(self.read_array(context)?))
    }

    #[inline]
    pub fn read_i16(&mut self, context: &'static str) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.read_array(context)?))
    }

    #[inline]
    pub fn read_i32(&mut self, context: &'static str) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.read_array(context)?))
    }

    #[inline]
    pub fn read_i64(&mut self, context: &'static str) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.read_array(context)?))
    }

    /// Reads a little-endian f32. NaN payloads are preserved.
    #[inline]
    pub fn read_f32(&mut self, context: &'static str) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.read_array(context)?))
    }

    /// Reads a little-endian f64. NaN payloads are preserved.
    #[inline]
    pub fn read_f64(&mut self, context: &'static str) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.read_array(context)?))
    }

    /// Reads a bool byte, rejecting anything but 0x00 and 0x01.
    pub fn read_bool(&mut self, context: &'static str) -> Result<bool, DecodeError> {
        let offset = self.pos;
        match self.read_byte(context)? {
            0x00 => Ok(false),
            0x01 => Ok(true),
            value => Err(DecodeError::InvalidBool { value, offset }),
        }
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writer for encoding binary data.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Creates a new writer with capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns a reference to the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if no bytes have been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes an unsigned varint (LEB128).
    #[inline]
    pub fn write_varint(&mut self, mut value: u64) {
        // Stack buffer batches the writes
        let mut buf = [0u8; MAX_VARINT_BYTES];
        let mut len = 0;
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            buf[len] = byte;
            len += 1;
            if value == 0 {
                break;
            }
        }
        self.buf.extend_from_slice(&buf[..len]);
    }

    /// Writes a signed varint (zigzag encoded).
    pub fn write_signed_varint(&mut self, value: i64) {
        self.write_varint(zigzag_encode(value));
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, s: &str) {
        self.write_varint(s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Writes a length-prefixed byte array.
    pub fn write_bytes_prefixed(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a little-endian f32.
    pub fn write_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a little-endian f64.
    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }
}

// =============================================================================
// ZIGZAG ENCODING
// =============================================================================

/// Encodes a signed integer using zigzag encoding.
///
/// Maps negative numbers to odd positive numbers:
/// 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
#[inline]
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Decodes a zigzag-encoded unsigned integer back to signed.
#[inline]
pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}
