#![deny(missing_docs)]

//! # dtrust-crypto: Cryptographic Primitives
//!
//! - **Ed25519** signing and verification for credential proofs and
//!   compact JWS tokens.
//! - **SHA-256** hashing, used for one-time code storage.
//! - **One-time codes** for email verification challenges: generation,
//!   hashing, and constant-time comparison.
//!
//! ## Crate Policy
//!
//! - Depends only on `dtrust-core` internally.
//! - No mocking of cryptographic operations in tests.
//! - Secret material never appears in `Debug` output.

pub mod code;
pub mod ed25519;
pub mod hex;
pub mod sha256;

pub use code::{CodeHash, OneTimeCode};
pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, JwsSigningInput};
pub use sha256::sha256_hex;
