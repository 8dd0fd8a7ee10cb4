//! # SHA-256 Hashing

use dtrust_core::CanonicalBytes;
use sha2::{Digest, Sha256};

/// SHA-256 of arbitrary bytes, as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    crate::hex::encode(&Sha256::digest(data))
}

/// SHA-256 of canonical bytes, as lowercase hex.
pub fn canonical_sha256_hex(data: &CanonicalBytes) -> String {
    sha256_hex(data.as_bytes())
}
