//! Canonical encoding and content hashing.
//!
//! The canonical form of a value is its deterministic-mode encoding: object
//! keys in byte order, sorted frames in row order, NaN in its quiet form.
//! Equal values under the same schema therefore share canonical bytes and a
//! content hash: `sha256(canonical_bytes)`.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::codec::{encode, EncodeOptions};
use crate::error::EncodeError;
use crate::model::schema::Schema;
use crate::model::value::Value;

/// SHA-256 digest of a value's canonical encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Base64url text without padding (43 characters).
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    /// Hashes already-canonical bytes.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }
}

impl From<[u8; 32]> for ContentHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for ContentHash {
    /// Lowercase hex.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Encodes `value` under `schema` in deterministic mode.
pub fn canonicalize(value: &Value, schema: &Schema) -> Result<Vec<u8>, EncodeError> {
    encode(value, schema, EncodeOptions::deterministic())
}

/// SHA-256 over the canonical encoding of `value`.
pub fn content_hash(value: &Value, schema: &Schema) -> Result<ContentHash, EncodeError> {
    let bytes = canonicalize(value, schema)?;
    let hash = ContentHash::of_bytes(&bytes);
    debug!(bytes = bytes.len(), hash = %hash, "content hash");
    Ok(hash)
}
