//! # Verifiable Credential Data Model
//!
//! A W3C VC (Data Model 1.1 field names) carrying the developer claims.
//! The envelope is rigid; `credentialSubject` is an open JSON object whose
//! `id` is always the subject DID.
//!
//! The data model `id` is optional on the wire. Locally built credentials
//! always carry `urn:uuid:<v4>`; a credential without an id is treated as
//! a failed build by the issuer.

use dtrust_core::{CanonicalizationError, CryptoError, Did, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Base W3C credentials context.
pub const W3C_CREDENTIALS_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// The type every credential carries.
pub const VC_TYPE: &str = "VerifiableCredential";

/// Errors from credential construction and compact-token handling.
#[derive(Error, Debug)]
pub enum VcError {
    /// Expiration precedes issuance.
    #[error("expirationDate {expiration} is before issuanceDate {issuance}")]
    InvalidValidityWindow {
        /// Issuance instant.
        issuance: Timestamp,
        /// Expiration instant.
        expiration: Timestamp,
    },

    /// The credential subject is not a JSON object.
    #[error("credentialSubject must be a JSON object")]
    SubjectNotObject,

    /// The compact token is structurally malformed.
    #[error("malformed compact credential: {0}")]
    MalformedToken(String),

    /// The token header names an algorithm other than EdDSA.
    #[error("unsupported JWS algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The issuer DID method does not embed a verification key.
    #[error("cannot derive a verification key from issuer {0}")]
    UnresolvableIssuer(String),

    /// Canonicalization of a token segment failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Signature or key failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Inputs for building a credential.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialClaims {
    /// The application-level credential type, appended after
    /// `VerifiableCredential`.
    pub credential_type: String,
    /// Issuer DID.
    pub issuer: Did,
    /// Subject DID; becomes `credentialSubject.id`.
    pub subject: Did,
    /// Additional subject claims.
    pub data: Map<String, Value>,
    /// Issuance instant.
    pub issuance_date: Timestamp,
    /// Expiration instant.
    pub expiration_date: Timestamp,
}

/// A W3C Verifiable Credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiableCredential {
    /// JSON-LD contexts.
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    /// Credential identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Credential types; the first is always `VerifiableCredential`.
    #[serde(rename = "type")]
    pub credential_type: Vec<String>,

    /// Issuer DID.
    pub issuer: String,

    /// Issuance instant.
    #[serde(rename = "issuanceDate")]
    pub issuance_date: Timestamp,

    /// Expiration instant.
    #[serde(rename = "expirationDate")]
    pub expiration_date: Timestamp,

    /// Subject claims, including the subject `id`.
    #[serde(rename = "credentialSubject")]
    pub credential_subject: Value,
}

impl VerifiableCredential {
    /// Build a credential data model with a fresh `urn:uuid:` id.
    ///
    /// # Errors
    ///
    /// [`VcError::InvalidValidityWindow`] when expiration precedes issuance.
    pub fn build(claims: CredentialClaims) -> Result<Self, VcError> {
        check_window(&claims.issuance_date, &claims.expiration_date)?;

        let mut subject = claims.data;
        subject.insert("id".to_string(), Value::String(claims.subject.to_string()));

        Ok(Self {
            context: vec![W3C_CREDENTIALS_CONTEXT.to_string()],
            id: Some(dtrust_core::CredentialId::generate().to_string()),
            credential_type: vec![VC_TYPE.to_string(), claims.credential_type],
            issuer: claims.issuer.to_string(),
            issuance_date: claims.issuance_date,
            expiration_date: claims.expiration_date,
            credential_subject: Value::Object(subject),
        })
    }

    /// Re-check the validity window of a credential received from elsewhere.
    pub fn check_validity_window(&self) -> Result<(), VcError> {
        check_window(&self.issuance_date, &self.expiration_date)
    }

    /// Whether the type list includes `VerifiableCredential`.
    pub fn contains_vc_type(&self) -> bool {
        self.credential_type.iter().any(|t| t == VC_TYPE)
    }

    /// The application-level type: the first entry that is not
    /// `VerifiableCredential`.
    pub fn primary_type(&self) -> Option<&str> {
        self.credential_type
            .iter()
            .map(String::as_str)
            .find(|t| *t != VC_TYPE)
    }

    /// The subject DID string, if present.
    pub fn subject_id(&self) -> Option<&str> {
        self.credential_subject.get("id").and_then(Value::as_str)
    }

    /// Whether the credential has expired at `now`.
    pub fn is_expired_at(&self, now: &Timestamp) -> bool {
        self.expiration_date < *now
    }
}

fn check_window(issuance: &Timestamp, expiration: &Timestamp) -> Result<(), VcError> {
    if expiration < issuance {
        return Err(VcError::InvalidValidityWindow {
            issuance: *issuance,
            expiration: *expiration,
        });
    }
    Ok(())
}
