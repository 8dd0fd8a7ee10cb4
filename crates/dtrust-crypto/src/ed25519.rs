//! # Ed25519 Signing and Verification
//!
//! Key material for the issuer identity and the proofs on issued
//! credentials.
//!
//! ## Signing inputs
//!
//! The signer accepts only two input types:
//!
//! - [`CanonicalBytes`] for detached proofs over JCS-canonical JSON.
//! - [`JwsSigningInput`] for compact JWS, the ASCII string
//!   `base64url(header) "." base64url(payload)`.
//!
//! Raw `&[u8]` cannot be signed.
//!
//! ## Serde
//!
//! Public keys and signatures serialize as lowercase hex strings. Key pairs
//! do not implement `Serialize`; the seed leaves the process only through
//! [`Ed25519KeyPair::seed_hex`], which returns a zeroizing buffer.

use dtrust_core::{CanonicalBytes, CryptoError};
use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::hex;

/// An Ed25519 public key (32 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(pub [u8; 32]);

/// An Ed25519 signature (64 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519Signature(pub [u8; 64]);

/// An Ed25519 key pair. Never serialized, never printed.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

/// The ASCII signing input of a compact JWS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwsSigningInput(String);

impl JwsSigningInput {
    /// Join already-encoded header and payload segments.
    pub fn new(header_b64: &str, payload_b64: &str) -> Self {
        Self(format!("{header_b64}.{payload_b64}"))
    }

    /// The `header.payload` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bytes that are signed.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

// ---------------------------------------------------------------------------
// Ed25519PublicKey
// ---------------------------------------------------------------------------

impl Ed25519PublicKey {
    /// Create a public key from raw 32 bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the raw 32-byte public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the public key as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse a public key from a 64-character hex string.
    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        hex::decode_array::<32>(value)
            .map(Self)
            .map_err(|e| CryptoError::KeyError(format!("public key: {e}")))
    }

    /// Convert to a dalek `VerifyingKey`. Fails for points not on the curve.
    pub fn to_verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::KeyError(format!("invalid public key: {e}")))
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_hex(&value).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", hex::prefix(&self.0))
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Ed25519Signature
// ---------------------------------------------------------------------------

impl Ed25519Signature {
    /// Create a signature from raw 64 bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Parse a signature from a byte slice of exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 64] = bytes.try_into().map_err(|_| {
            CryptoError::Encoding(format!("signature must be 64 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Return the raw 64-byte signature.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Render the signature as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse a signature from a 128-character hex string.
    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        hex::decode_array::<64>(value).map(Self)
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_hex(&value).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", hex::prefix(&self.0))
    }
}

// ---------------------------------------------------------------------------
// Ed25519KeyPair
// ---------------------------------------------------------------------------

impl Ed25519KeyPair {
    /// Generate a new random key pair from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Create a key pair from a raw 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Create a key pair from a 64-character hex seed.
    pub fn from_seed_hex(value: &str) -> Result<Self, CryptoError> {
        let seed = Zeroizing::new(
            hex::decode_array::<32>(value)
                .map_err(|e| CryptoError::KeyError(format!("signing key seed: {e}")))?,
        );
        Ok(Self::from_seed(&seed))
    }

    /// The seed as lowercase hex, for writing a key file.
    pub fn seed_hex(&self) -> Zeroizing<String> {
        let seed = Zeroizing::new(self.signing_key.to_bytes());
        Zeroizing::new(hex::encode(&seed[..]))
    }

    /// The public half of this key pair.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign canonical JSON bytes.
    pub fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(data.as_bytes()).to_bytes())
    }

    /// Sign a compact JWS signing input.
    pub fn sign_jws(&self, input: &JwsSigningInput) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(input.as_bytes()).to_bytes())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519KeyPair(<private>)")
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

fn verify_raw(
    message: &[u8],
    signature: &Ed25519Signature,
    public_key: &Ed25519PublicKey,
) -> Result<(), CryptoError> {
    let vk = public_key.to_verifying_key()?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify(message, &sig)
        .map_err(|e| CryptoError::VerificationFailed(format!("Ed25519 verification failed: {e}")))
}

/// Verify a signature over canonical bytes.
pub fn verify(
    data: &CanonicalBytes,
    signature: &Ed25519Signature,
    public_key: &Ed25519PublicKey,
) -> Result<(), CryptoError> {
    verify_raw(data.as_bytes(), signature, public_key)
}

/// Verify a signature over a compact JWS signing input.
pub fn verify_jws(
    input: &JwsSigningInput,
    signature: &Ed25519Signature,
    public_key: &Ed25519PublicKey,
) -> Result<(), CryptoError> {
    verify_raw(input.as_bytes(), signature, public_key)
}
