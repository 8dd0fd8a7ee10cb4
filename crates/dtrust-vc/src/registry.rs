//! # Credential Registry
//!
//! The collaborator the credential issuer consumes: build a data model from
//! claims, sign it into a compact JWS, and verify compact JWS tokens.
//!
//! [`LocalCredentialRegistry`] verifies tokens whose issuer is a
//! `did:dtrust` DID by recovering the key from the DID itself. Tokens from
//! any other DID method verify as `false`.

use dtrust_core::Timestamp;
use thiserror::Error;

use crate::credential::{CredentialClaims, VcError, VerifiableCredential};
use crate::did::{public_key_from_did, IssuerIdentity};
use crate::jwt;

/// Failure of a registry collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The registry could not be reached or failed internally.
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    /// The registry does not know the requested identifier.
    #[error("not found in registry: {0}")]
    NotFound(String),

    /// The registry refused the request.
    #[error("registry rejected request: {0}")]
    Rejected(String),
}

impl From<VcError> for RegistryError {
    fn from(err: VcError) -> Self {
        match err {
            VcError::InvalidValidityWindow { .. } | VcError::SubjectNotObject => {
                Self::Rejected(err.to_string())
            }
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Collaborator that builds, signs and verifies credentials.
pub trait CredentialRegistry: Send + Sync {
    /// Build a credential data model from claims.
    fn create(&self, claims: CredentialClaims) -> Result<VerifiableCredential, RegistryError>;

    /// Sign a credential into its compact form.
    fn sign(
        &self,
        credential: &VerifiableCredential,
        signer: &IssuerIdentity,
    ) -> Result<String, RegistryError>;

    /// Verify a compact credential. Malformed, forged and expired tokens
    /// yield `Ok(false)`.
    fn verify(&self, compact: &str) -> Result<bool, RegistryError>;
}

/// Ed25519-backed credential registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalCredentialRegistry;

impl LocalCredentialRegistry {
    /// Create the registry.
    pub fn new() -> Self {
        Self
    }
}

impl CredentialRegistry for LocalCredentialRegistry {
    fn create(&self, claims: CredentialClaims) -> Result<VerifiableCredential, RegistryError> {
        Ok(VerifiableCredential::build(claims)?)
    }

    fn sign(
        &self,
        credential: &VerifiableCredential,
        signer: &IssuerIdentity,
    ) -> Result<String, RegistryError> {
        Ok(jwt::encode(
            credential,
            signer.signing_key(),
            Some(signer.key_id()),
        )?)
    }

    fn verify(&self, compact: &str) -> Result<bool, RegistryError> {
        let decoded = match jwt::decode(compact) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::debug!(error = %e, "compact credential did not decode");
                return Ok(false);
            }
        };
        let public_key = match public_key_from_did(&decoded.claims.iss) {
            Ok(pk) => pk,
            Err(e) => {
                tracing::debug!(error = %e, "issuer key not derivable");
                return Ok(false);
            }
        };
        if let Err(e) = decoded.verify_signature(&public_key) {
            tracing::debug!(error = %e, "credential signature rejected");
            return Ok(false);
        }
        if decoded.credential().issuer != decoded.claims.iss {
            tracing::debug!("credential issuer does not match token issuer");
            return Ok(false);
        }
        Ok(decoded.is_current_at(&Timestamp::now()))
    }
}
