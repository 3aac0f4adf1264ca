//! Binary encoding/decoding for DON.
//!
//! Layering, bottom up: [`primitives`] (varints, fixed-width numbers,
//! length-prefixed framing), [`tag`] (type tags), [`value`] and [`frame`]
//! (value layouts), [`message`] (header and entry points).

pub mod frame;
pub mod message;
pub mod primitives;
pub mod tag;
pub mod value;

pub use frame::{null_bitmap, sorted_row_order};
pub use message::{decode, decode_dynamic, encode, encode_dynamic, peek_header, EncodeOptions, Header};
pub use primitives::{zigzag_decode, zigzag_encode, Reader, Writer};
pub use tag::{TypeTag, WireTag};
