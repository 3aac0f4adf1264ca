//! Wire constants and decoder safety limits.
//!
//! The limits bound every allocation the decoder makes from a length prefix,
//! so a hostile message cannot exhaust memory or the stack.

/// Magic bytes at the start of every message.
pub const MAGIC: &[u8; 4] = b"DONB";

/// Current (and only accepted) format version.
pub const FORMAT_VERSION: u8 = 1;

/// Size of the fixed header: magic + version + flags.
pub const HEADER_LEN: usize = 6;

/// Flags bit 0: message was written in deterministic mode.
pub const FLAG_DETERMINISTIC: u8 = 0x01;

/// Maximum bytes in an unsigned LEB128 varint for a u64.
pub const MAX_VARINT_BYTES: usize = 10;

/// Maximum string length in bytes.
pub const MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// Maximum byte-sequence length.
pub const MAX_BYTES_LEN: usize = 64 * 1024 * 1024;

/// Maximum length of a bigint or decimal mantissa in bytes.
pub const MAX_MANTISSA_BYTES: usize = 4096;

/// Maximum number of array elements or object keys.
pub const MAX_COLLECTION_LEN: usize = 4 * 1024 * 1024;

/// Maximum number of rows in one frame.
pub const MAX_FRAME_ROWS: usize = 16 * 1024 * 1024;

/// Maximum number of columns in one frame.
pub const MAX_FRAME_COLUMNS: usize = 4096;

/// Maximum nesting depth accepted by the schema-less decoder.
pub const MAX_DEPTH: usize = 128;

/// Largest magnitude an integer may have to be written as a JSON number.
pub const JSON_SAFE_INTEGER: i64 = (1 << 53) - 1;
