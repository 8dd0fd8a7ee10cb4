#![deny(missing_docs)]

//! # dtrust-vc: Verifiable Credentials and Decentralized Identifiers
//!
//! - [`credential`]: the W3C VC data model and its builder.
//! - [`jwt`]: compact JWS (`EdDSA`) encoding, decoding and verification.
//! - [`did`]: DID documents, the [`IdentityRegistry`] collaborator and its
//!   local `did:dtrust` implementation, and the issuer identity.
//! - [`registry`]: the [`CredentialRegistry`] collaborator and its local
//!   Ed25519-backed implementation.
//!
//! Registries are synchronous `Send + Sync` traits so that callers can hold
//! them as `Arc<dyn ...>` and substitute fakes in tests.

pub mod credential;
pub mod did;
pub mod jwt;
pub mod registry;

pub use credential::{CredentialClaims, VcError, VerifiableCredential};
pub use did::{DidDocument, IdentifierMaterial, IdentityRegistry, IssuerIdentity, LocalIdentityRegistry};
pub use jwt::DecodedCredential;
pub use registry::{CredentialRegistry, LocalCredentialRegistry, RegistryError};
