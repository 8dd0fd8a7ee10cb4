#![deny(missing_docs)]

//! # dtrust-core: Foundational Types for Developer Onboarding
//!
//! This crate is the leaf of the DecenTrust workspace. It defines the
//! primitives every other crate builds on; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `DeveloperId`, `Email`,
//!    `Did`, `CredentialId` validate at construction. No bare strings for
//!    identifiers crossing crate boundaries.
//!
//! 2. **`CanonicalBytes` newtype.** Every byte sequence that gets signed
//!    flows through `CanonicalBytes::new()` (RFC 8785 JSON canonicalization).
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC, truncated to seconds,
//!    and carries the calendar-month arithmetic the credential validity
//!    windows need.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `dtrust-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use error::{CanonicalizationError, CryptoError, StateTransitionError, ValidationError};
pub use identity::{CredentialId, DeveloperId, Did, Email};
pub use temporal::Timestamp;
