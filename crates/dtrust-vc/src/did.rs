//! # Decentralized Identifiers
//!
//! The `did:dtrust` method is self-certifying: the method-specific id is the
//! lowercase hex of an Ed25519 verifying key, so the verification key of any
//! `did:dtrust` DID can be recovered from the URI alone.
//!
//! [`IdentityRegistry`] is the collaborator the identity issuer consumes.
//! [`LocalIdentityRegistry`] mints `did:dtrust` identifiers in process and
//! keeps their published documents. Secret keys of minted identifiers are
//! dropped after creation; only public material is retained.

use std::collections::HashMap;

use dtrust_core::{Did, Timestamp};
use dtrust_crypto::{Ed25519KeyPair, Ed25519PublicKey};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::credential::VcError;
use crate::registry::RegistryError;

/// The DID method minted by this crate.
pub const DID_METHOD: &str = "dtrust";

/// Verification method type used in documents.
pub const ED25519_VERIFICATION_KEY: &str = "Ed25519VerificationKey2020";

/// A verification method entry of a DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// `<did>#key-0`.
    pub id: String,
    /// Key type.
    #[serde(rename = "type")]
    pub method_type: String,
    /// Controlling DID.
    pub controller: String,
    /// Hex-encoded public key.
    pub public_key_hex: String,
}

/// A minimal DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// The DID this document describes.
    pub id: String,
    /// Verification methods.
    pub verification_method: Vec<VerificationMethod>,
    /// References into `verification_method` usable for authentication.
    pub authentication: Vec<String>,
    /// References usable for assertions (credential issuance).
    pub assertion_method: Vec<String>,
    /// When the document was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<Timestamp>,
}

impl DidDocument {
    /// Build the document for a `did:dtrust` key.
    pub fn for_key(did: &Did, public_key: &Ed25519PublicKey) -> Self {
        let key_id = key_id(did);
        Self {
            id: did.to_string(),
            verification_method: vec![VerificationMethod {
                id: key_id.clone(),
                method_type: ED25519_VERIFICATION_KEY.to_string(),
                controller: did.to_string(),
                public_key_hex: public_key.to_hex(),
            }],
            authentication: vec![key_id.clone()],
            assertion_method: vec![key_id],
            updated: Some(Timestamp::now()),
        }
    }
}

/// The DID URI and document returned by a registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierMaterial {
    /// The DID URI.
    pub uri: Did,
    /// The published document.
    pub document: serde_json::Value,
}

/// `<did>#key-0`.
pub fn key_id(did: &Did) -> String {
    format!("{did}#key-0")
}

/// The `did:dtrust` DID of a verifying key.
pub fn did_for_key(public_key: &Ed25519PublicKey) -> Result<Did, VcError> {
    Did::new(format!("did:{DID_METHOD}:{}", public_key.to_hex()))
        .map_err(|e| VcError::UnresolvableIssuer(e.to_string()))
}

/// Recover the verifying key embedded in a `did:dtrust` DID (a fragment is
/// ignored).
pub fn public_key_from_did(did: &str) -> Result<Ed25519PublicKey, VcError> {
    let parsed = Did::new(did).map_err(|_| VcError::UnresolvableIssuer(did.to_string()))?;
    if parsed.method() != DID_METHOD {
        return Err(VcError::UnresolvableIssuer(did.to_string()));
    }
    Ed25519PublicKey::from_hex(parsed.method_specific_id())
        .map_err(|_| VcError::UnresolvableIssuer(did.to_string()))
}

/// Collaborator that mints and resolves decentralized identifiers.
///
/// `create` is not idempotent: every call mints a new identifier.
pub trait IdentityRegistry: Send + Sync {
    /// Mint a new identifier.
    fn create(&self) -> Result<IdentifierMaterial, RegistryError>;

    /// Resolve the current document of `uri`.
    fn resolve(&self, uri: &Did) -> Result<IdentifierMaterial, RegistryError>;
}

/// In-process `did:dtrust` registry.
#[derive(Debug, Default)]
pub struct LocalIdentityRegistry {
    documents: RwLock<HashMap<Did, DidDocument>>,
}

impl LocalIdentityRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identifiers minted by this registry.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether nothing has been minted yet.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

fn to_material(uri: Did, document: &DidDocument) -> Result<IdentifierMaterial, RegistryError> {
    let document = serde_json::to_value(document)
        .map_err(|e| RegistryError::Unavailable(format!("document encoding: {e}")))?;
    Ok(IdentifierMaterial { uri, document })
}

impl IdentityRegistry for LocalIdentityRegistry {
    fn create(&self) -> Result<IdentifierMaterial, RegistryError> {
        let key = Ed25519KeyPair::generate();
        let public_key = key.public_key();
        let did = did_for_key(&public_key).map_err(|e| RegistryError::Unavailable(e.to_string()))?;
        let document = DidDocument::for_key(&did, &public_key);
        self.documents.write().insert(did.clone(), document.clone());
        tracing::debug!(did = %did, "minted identifier");
        to_material(did, &document)
    }

    fn resolve(&self, uri: &Did) -> Result<IdentifierMaterial, RegistryError> {
        if let Some(doc) = self.documents.read().get(uri) {
            let mut refreshed = doc.clone();
            refreshed.updated = Some(Timestamp::now());
            return to_material(uri.clone(), &refreshed);
        }
        // Self-certifying: any well-formed did:dtrust resolves from its key.
        let public_key = public_key_from_did(uri.as_str())
            .map_err(|_| RegistryError::NotFound(uri.to_string()))?;
        to_material(uri.clone(), &DidDocument::for_key(uri, &public_key))
    }
}

/// The issuer: a signing key and the DID derived from it.
pub struct IssuerIdentity {
    did: Did,
    key: Ed25519KeyPair,
}

impl IssuerIdentity {
    /// Derive the issuer DID from `key`.
    pub fn new(key: Ed25519KeyPair) -> Result<Self, VcError> {
        let did = did_for_key(&key.public_key())?;
        Ok(Self { did, key })
    }

    /// The issuer DID.
    pub fn did(&self) -> &Did {
        &self.did
    }

    /// The verification method id used as JWS `kid`.
    pub fn key_id(&self) -> String {
        key_id(&self.did)
    }

    /// The signing key.
    pub fn signing_key(&self) -> &Ed25519KeyPair {
        &self.key
    }
}

impl std::fmt::Debug for IssuerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerIdentity")
            .field("did", &self.did)
            .field("key", &"<private>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_identifiers_are_unique_and_resolvable() {
        let registry = LocalIdentityRegistry::new();
        let a = registry.create().unwrap();
        let b = registry.create().unwrap();
        assert_ne!(a.uri, b.uri);
        assert_eq!(a.uri.method(), DID_METHOD);
        assert_eq!(registry.len(), 2);

        let resolved = registry.resolve(&a.uri).unwrap();
        assert_eq!(resolved.uri, a.uri);
        assert_eq!(resolved.document["id"], a.uri.as_str());
        assert_eq!(
            resolved.document["verificationMethod"][0]["type"],
            ED25519_VERIFICATION_KEY
        );
    }

    #[test]
    fn document_carries_no_private_material() {
        let registry = LocalIdentityRegistry::new();
        let created = registry.create().unwrap();
        let text = created.document.to_string();
        assert!(!text.contains("private"));
        assert!(!text.contains("secret"));
    }

    #[test]
    fn foreign_dtrust_did_resolves_from_key() {
        let key = Ed25519KeyPair::generate();
        let did = did_for_key(&key.public_key()).unwrap();
        let resolved = LocalIdentityRegistry::new().resolve(&did).unwrap();
        assert_eq!(
            resolved.document["verificationMethod"][0]["publicKeyHex"],
            key.public_key().to_hex()
        );
    }

    #[test]
    fn unknown_method_is_not_found() {
        let did = Did::new("did:web:example.com").unwrap();
        let err = LocalIdentityRegistry::new().resolve(&did).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[test]
    fn key_round_trips_through_did() {
        let key = Ed25519KeyPair::generate();
        let did = did_for_key(&key.public_key()).unwrap();
        assert_eq!(public_key_from_did(did.as_str()).unwrap(), key.public_key());
        assert_eq!(
            public_key_from_did(&format!("{did}#key-0")).unwrap(),
            key.public_key()
        );
        assert!(public_key_from_did("did:dtrust:abc").is_err());
    }

    #[test]
    fn issuer_debug_hides_key() {
        let issuer = IssuerIdentity::new(Ed25519KeyPair::generate()).unwrap();
        let debug = format!("{issuer:?}");
        assert!(debug.contains("<private>"));
        assert!(issuer.key_id().ends_with("#key-0"));
    }
}
