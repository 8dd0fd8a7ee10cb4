#![deny(missing_docs)]

//! # dtrust-cli: Operator CLI for the DecenTrust Stack
//!
//! Provides the `dtrust` command-line interface for operating an issuer
//! offline.
//!
//! ## Subcommands
//!
//! - `dtrust keygen`: generate an issuer seed and print its DID.
//! - `dtrust did`: print the DID for an existing seed.
//! - `dtrust inspect`: decode a credential JWT without verifying it.
//! - `dtrust verify`: verify a credential JWT against its issuer DID.
//!
//! ```bash
//! dtrust keygen --out issuer.key
//! ISSUER_KEY_FILE=issuer.key dtrust-api
//! dtrust verify eyJhbGciOiJFZERTQSIs...
//! ```

pub mod credential;
pub mod keys;
