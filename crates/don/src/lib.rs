//! DON: a self-describing binary codec for object graphs and columnar frames.
//!
//! This crate provides encoding, decoding, validation, a JSON bridge and
//! content hashing for DON values described by a language-neutral schema.
//!
//! # Overview
//!
//! DON is designed for:
//! - **Schema-driven data**: front-ends compile to one [`TypeDescriptor`] tree
//! - **Binary-first**: fixed-width integers where the schema pins them, column-major frames
//! - **Content addressing**: deterministic mode yields stable bytes to hash
//!
//! # Quick Start
//!
//! ```rust
//! use don::{decode, encode, validate, Constraints, EncodeOptions, Field, Object, Schema};
//! use don::{TypeDescriptor, ValidateOptions, Value};
//!
//! let schema = Schema::new(TypeDescriptor::object(vec![
//!     Field::new("name", TypeDescriptor::String),
//!     Field::new("age", TypeDescriptor::Int32)
//!         .with_constraints(Constraints::new().min(0).max(150)),
//! ]))
//! .unwrap();
//!
//! let person = Value::Object(Object::new().with("name", "Ada").with("age", 36));
//!
//! // Check constraints, then encode to binary
//! let person = validate(&person, &schema, &ValidateOptions::new()).unwrap();
//! let bytes = encode(&person, &schema, EncodeOptions::new()).unwrap();
//!
//! // Decode back
//! let decoded = decode(&bytes, &schema).unwrap();
//! assert_eq!(person, decoded);
//! ```
//!
//! # Modules
//!
//! - [`model`]: Values, numbers, frames and schemas
//! - [`codec`]: Binary encoding/decoding, schema-driven and dynamic
//! - [`json`]: Schema-driven JSON bridge
//! - [`validate`]: Type and constraint validation with optional coercion
//! - [`canonical`]: Deterministic encoding and SHA-256 content hashes
//! - [`error`]: Error types
//! - [`limits`]: Wire constants and security limits for decoding
//!
//! # Security
//!
//! The decoder is designed to safely handle untrusted input:
//! - Every length prefix is checked against both a limit and the remaining input
//! - Nesting depth is bounded
//! - Invalid data is rejected with the byte offset of the fault
//!
//! # Wire Format
//!
//! A message is `DONB` magic + version byte + flags byte, then the tagged root
//! value. Flag bit 0 marks deterministic encoding; other bits are reserved.

pub mod canonical;
pub mod codec;
pub mod error;
pub mod json;
pub mod limits;
pub mod model;
pub mod util;
pub mod validate;

// Re-export commonly used types at crate root
pub use canonical::{canonicalize, content_hash, ContentHash};
pub use codec::{decode, decode_dynamic, encode, encode_dynamic, EncodeOptions};
pub use error::{DecodeError, EncodeError, ErrorCode, JsonError, Path, SchemaError, ValidationError, ValidationErrorKind};
pub use json::{from_json, from_json_str, to_json, to_json_string};
pub use model::{
    BigInt, Column, Constraints, Decimal, EnumType, Field, Frame, FrameColumn, IntWidth, Object, Schema,
    SchemaBuilder, SortOrder, TypeDescriptor, Value,
};
pub use validate::{validate, ValidateOptions};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wire format version this crate reads and writes.
pub const FORMAT_VERSION: u8 = limits::FORMAT_VERSION;
