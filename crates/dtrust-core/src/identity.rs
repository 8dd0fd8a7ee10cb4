//! # Identity Newtypes
//!
//! Domain-primitive newtypes for the identifiers that cross crate
//! boundaries. Each identifier is a distinct type: a [`DeveloperId`]
//! cannot be passed where a [`CredentialId`] is expected.
//!
//! ## Validation
//!
//! String-based identifiers ([`Email`], [`Did`], [`CredentialId`]) validate
//! at construction and again on deserialization. [`DeveloperId`] is valid
//! by construction.
//!
//! - Email: `local@domain.tld`, trimmed and lower-cased (the unique key of
//!   a developer record).
//! - DID: `did:<method>:<id>(/<segment>)*(#<fragment>)?` where method is
//!   `[A-Za-z0-9_]+` and id, segments and fragment are `[A-Za-z0-9_.-]+`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// UUID-based identifiers
// ---------------------------------------------------------------------------

/// Identifier of a developer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeveloperId(Uuid);

impl DeveloperId {
    /// Create a new random developer identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a developer identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DeveloperId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for DeveloperId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidDeveloperId(s.to_string()))
    }
}

impl std::fmt::Display for DeveloperId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

/// A normalized email address.
///
/// Construction trims surrounding whitespace and lower-cases the address,
/// so two spellings of the same mailbox compare equal. This is the value
/// the store indexes for uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Normalize and validate an email address.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEmail`] unless the address has a
    /// non-empty local part, a single `@`, and a domain containing an
    /// interior dot. Whitespace anywhere inside the address is rejected.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let normalized = value.as_ref().trim().to_lowercase();
        if !is_valid_email(&normalized) {
            return Err(ValidationError::InvalidEmail(value.as_ref().to_string()));
        }
        Ok(Self(normalized))
    }

    /// Access the normalized address.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A log-safe rendering: the first three characters followed by `***`.
    pub fn masked(&self) -> String {
        let prefix: String = self.0.chars().take(3).collect();
        format!("{prefix}***")
    }
}

fn is_valid_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = s.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.len() < 3 {
        return false;
    }
    let interior = &domain[1..domain.len() - 1];
    interior.contains('.')
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// DID
// ---------------------------------------------------------------------------

/// W3C Decentralized Identifier URI.
///
/// Reference: <https://www.w3.org/TR/did-core/#did-syntax>
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Create a DID from a string, validating the URI grammar.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDid`] if the string does not match
    /// `did:<method>:<id>(/<segment>)*(#<fragment>)?`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if parse_did(&s).is_none() {
            return Err(ValidationError::InvalidDid(s));
        }
        Ok(Self(s))
    }

    /// Access the DID string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The DID method (between the first and second colon).
    pub fn method(&self) -> &str {
        parse_did(&self.0).map(|p| p.method).unwrap_or_default()
    }

    /// The method-specific identifier, without path or fragment.
    pub fn method_specific_id(&self) -> &str {
        parse_did(&self.0).map(|p| p.id).unwrap_or_default()
    }
}

struct DidParts<'a> {
    method: &'a str,
    id: &'a str,
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_id_char(c: char) -> bool {
    is_word(c) || c == '.' || c == '-'
}

fn is_id_segment(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_id_char)
}

fn parse_did(s: &str) -> Option<DidParts<'_>> {
    let rest = s.strip_prefix("did:")?;
    let (method, rest) = rest.split_once(':')?;
    if method.is_empty() || !method.chars().all(is_word) {
        return None;
    }

    let (path, fragment) = match rest.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (rest, None),
    };
    if let Some(fragment) = fragment {
        if !is_id_segment(fragment) {
            return None;
        }
    }

    let mut segments = path.split('/');
    let id = segments.next()?;
    if !is_id_segment(id) || !segments.all(is_id_segment) {
        return None;
    }
    Some(DidParts { method, id })
}

impl TryFrom<String> for Did {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Credential identifier
// ---------------------------------------------------------------------------

/// Identifier of an issued verifiable credential.
///
/// Assigned by the credential registry when it builds the data model
/// (`urn:uuid:<v4>` for locally built credentials). The store keys
/// credentials on this value to reject duplicate persistence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialId(String);

impl CredentialId {
    /// Wrap an identifier produced by a credential registry.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCredentialId`] for empty values or
    /// values containing whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidCredentialId(s));
        }
        Ok(Self(s))
    }

    /// Generate a fresh `urn:uuid:` identifier.
    pub fn generate() -> Self {
        Self(format!("urn:uuid:{}", Uuid::new_v4()))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CredentialId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CredentialId> for String {
    fn from(id: CredentialId) -> Self {
        id.0
    }
}

impl std::fmt::Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn developer_id_parses_its_display() {
        let id = DeveloperId::new();
        let parsed: DeveloperId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn developer_id_rejects_garbage() {
        assert!("dev-42".parse::<DeveloperId>().is_err());
    }

    #[test]
    fn email_is_normalized() {
        let email = Email::new("  A@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "a@example.com");
        assert_eq!(email, Email::new("a@example.com").unwrap());
    }

    #[test]
    fn email_rejections() {
        for bad in [
            "",
            "plain",
            "@example.com",
            "a@",
            "a@example",
            "a@.com",
            "a@example.",
            "a b@example.com",
            "a@@example.com",
        ] {
            assert!(Email::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn email_masking_keeps_three_chars() {
        let email = Email::new("alice@example.com").unwrap();
        assert_eq!(email.masked(), "ali***");
        let short = Email::new("a@b.co").unwrap();
        assert_eq!(short.masked(), "a@b***");
    }

    #[test]
    fn email_deserialization_validates() {
        let ok: Email = serde_json::from_str("\"Bob@Example.org\"").unwrap();
        assert_eq!(ok.as_str(), "bob@example.org");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }

    #[test]
    fn did_accepts_common_forms() {
        for good in [
            "did:dht:i9xkp8ddcbcg8jwq54ox699wuzxyifsqx4jru45zodqu453ksz6y",
            "did:web:example.com",
            "did:dtrust:0a1b2c",
            "did:web:example.com/users/alice",
            "did:dtrust:abc#key-1",
        ] {
            assert!(Did::new(good).is_ok(), "{good:?} should be accepted");
        }
    }

    #[test]
    fn did_rejects_malformed() {
        for bad in [
            "",
            "did:",
            "did:web",
            "did::abc",
            "did:web:",
            "did:we b:abc",
            "did:web:abc/",
            "did:web:abc#",
            "dod:web:abc",
            "did:web:a:b",
        ] {
            assert!(Did::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn did_accessors() {
        let did = Did::new("did:web:example.com/users#key-1").unwrap();
        assert_eq!(did.method(), "web");
        assert_eq!(did.method_specific_id(), "example.com");
    }

    #[test]
    fn credential_id_generate_is_urn() {
        let id = CredentialId::generate();
        assert!(id.as_str().starts_with("urn:uuid:"));
        assert_ne!(id, CredentialId::generate());
    }

    #[test]
    fn credential_id_rejects_blank() {
        assert!(CredentialId::new("").is_err());
        assert!(CredentialId::new("urn:uuid: 1").is_err());
    }

    proptest! {
        #[test]
        fn did_grammar_accepts_word_segments(
            method in "[a-z0-9_]{1,8}",
            id in "[A-Za-z0-9_.-]{1,24}",
        ) {
            let raw = format!("did:{method}:{id}");
            let did = Did::new(raw.clone()).unwrap();
            prop_assert_eq!(did.method(), method.as_str());
            prop_assert_eq!(did.method_specific_id(), id.as_str());
        }

        #[test]
        fn email_normalization_is_idempotent(local in "[a-zA-Z0-9._]{1,12}", host in "[a-z]{1,10}") {
            let email = Email::new(format!("{local}@{host}.com")).unwrap();
            let again = Email::new(email.as_str()).unwrap();
            prop_assert_eq!(email, again);
        }
    }
}
