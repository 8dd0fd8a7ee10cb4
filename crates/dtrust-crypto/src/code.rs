//! # One-Time Verification Codes
//!
//! A challenge code is six decimal digits drawn uniformly from
//! `100000..=999999`. Only its SHA-256 hash is ever stored.
//!
//! A consumed or superseded challenge is overwritten with
//! [`CodeHash::invalidated`], a sentinel that matches no code. Comparison
//! runs in constant time over the hex digests.

use rand::Rng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::sha256::sha256_hex;

/// Lowest code value (inclusive).
pub const CODE_MIN: u32 = 100_000;
/// Highest code value (inclusive).
pub const CODE_MAX: u32 = 999_999;

const INVALIDATED: &str = "invalidated";

/// A plaintext one-time code.
///
/// Exists only long enough to be hashed and mailed. Zeroed on drop and
/// redacted in `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct OneTimeCode(String);

impl OneTimeCode {
    /// Draw a fresh code from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let n = rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX);
        Self(n.to_string())
    }

    /// Wrap a code supplied by a user. Whitespace is trimmed; no other
    /// validation happens here so that a malformed submission simply fails
    /// to match.
    pub fn from_submitted(code: &str) -> Self {
        Self(code.trim().to_string())
    }

    /// The digits, for inclusion in the outbound email.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Hash this code for storage.
    pub fn hash(&self) -> CodeHash {
        CodeHash(sha256_hex(self.0.as_bytes()))
    }
}

impl std::fmt::Debug for OneTimeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OneTimeCode(<redacted>)")
    }
}

/// Stored hash of a one-time code, or the invalidation sentinel.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeHash(String);

impl CodeHash {
    /// The sentinel written over a consumed or superseded challenge.
    pub fn invalidated() -> Self {
        Self(INVALIDATED.to_string())
    }

    /// Whether this is the invalidation sentinel.
    pub fn is_invalidated(&self) -> bool {
        self.0 == INVALIDATED
    }

    /// Constant-time check of a submitted code against this hash.
    ///
    /// Always false for the invalidation sentinel.
    pub fn matches(&self, submitted: &OneTimeCode) -> bool {
        if self.is_invalidated() {
            return false;
        }
        let candidate = submitted.hash();
        self.0.as_bytes().ct_eq(candidate.0.as_bytes()).into()
    }
}

impl std::fmt::Debug for CodeHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_invalidated() {
            f.write_str("CodeHash(<invalidated>)")
        } else {
            let prefix: String = self.0.chars().take(8).collect();
            write!(f, "CodeHash({prefix}...)")
        }
    }
}
