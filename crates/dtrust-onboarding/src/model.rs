//! # Onboarding Records
//!
//! Persisted records and their public projections. Projections are what
//! the saga returns; records stay behind the store. Identifier documents,
//! code hashes and customer ids never appear in a projection.

use dtrust_core::{CredentialId, DeveloperId, Did, Email, Timestamp, ValidationError};
use dtrust_crypto::CodeHash;
use dtrust_state::{CredentialStatus, IdentifierStatus, OnboardingLifecycle, OnboardingState};
use dtrust_vc::VerifiableCredential;
use serde::{Deserialize, Serialize};

/// Kind of service a developer registers a domain for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionType {
    /// An AI model or agent.
    Ai,
    /// A conventional service.
    Service,
}

impl ExtensionType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Service => "service",
        }
    }

    /// Identifier type minted for this extension.
    pub fn identifier_type(&self) -> IdentifierType {
        match self {
            Self::Ai => IdentifierType::Device,
            Self::Service => IdentifierType::Service,
        }
    }

    /// One-letter suffix used in profile names (`acme.m`, `acme.s`).
    pub fn profile_suffix(&self) -> &'static str {
        match self {
            Self::Ai => "m",
            Self::Service => "s",
        }
    }

    /// Inverse of [`profile_suffix`](Self::profile_suffix): `m` is `Ai`,
    /// anything else `Service`.
    pub fn from_profile_suffix(suffix: &str) -> Self {
        if suffix == "m" {
            Self::Ai
        } else {
            Self::Service
        }
    }
}

impl std::str::FromStr for ExtensionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ai" => Ok(Self::Ai),
            "service" => Ok(Self::Service),
            other => Err(ValidationError::InvalidField {
                field: "extensionType",
                reason: format!("expected \"ai\" or \"service\", got {other:?}"),
            }),
        }
    }
}

impl std::fmt::Display for ExtensionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription tier, derived from the billed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// Entry tier.
    Basic,
    /// Upper tier.
    Premium,
}

impl PlanType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Premium => "premium",
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subject category of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierType {
    /// A person.
    User,
    /// A network service.
    Service,
    /// A company or team.
    Organization,
    /// An autonomous agent or device.
    Device,
}

/// Input to registration. Strings are raw; the saga validates them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email; normalized on registration.
    pub email: String,
    /// Domain label, e.g. `acme`.
    pub domain_name: String,
    /// `ai` or `service`.
    pub extension_type: String,
    /// Identifier suffix; defaults to the extension type.
    #[serde(default)]
    pub extension_name: Option<String>,
    /// Company shown on the public profile.
    #[serde(default)]
    pub company_name: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Homepage URL.
    #[serde(default)]
    pub web_link: Option<String>,
    /// LinkedIn profile URL.
    #[serde(default)]
    pub linked_in: Option<String>,
    /// GitHub profile URL.
    #[serde(default)]
    pub github: Option<String>,
    /// Hugging Face profile URL.
    #[serde(default)]
    pub hugging_face: Option<String>,
}

/// Free-form profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperProfile {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Company shown on the public profile.
    pub company_name: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Homepage URL.
    pub web_link: Option<String>,
    /// LinkedIn profile URL.
    pub linked_in: Option<String>,
    /// GitHub profile URL.
    pub github: Option<String>,
    /// Hugging Face profile URL.
    pub hugging_face: Option<String>,
}

impl DeveloperProfile {
    /// "First Last", trimmed.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A pending one-time code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationChallenge {
    /// Hash of the code, or the invalidated sentinel.
    pub code_hash: CodeHash,
    /// After this instant the code no longer verifies.
    pub expires_at: Timestamp,
}

/// Payment relationship, written only after the provider reports "paid".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    /// Checkout session that produced the subscription.
    pub session_id: String,
    /// Provider subscription id.
    pub subscription_id: String,
    /// Billed price id.
    pub plan_id: String,
    /// Tier resolved from the plan catalog.
    pub plan_type: PlanType,
    /// Start of the current period.
    pub start_date: Timestamp,
    /// End of the current period.
    pub end_date: Timestamp,
    /// Period length in whole days.
    pub duration_days: i64,
}

/// A prospective API consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeveloperRecord {
    /// Stable id.
    pub id: DeveloperId,
    /// Unique, normalized email.
    pub email: Email,
    /// Profile fields.
    pub profile: DeveloperProfile,
    /// Domain label.
    pub domain_name: String,
    /// Extension kind.
    pub extension_type: ExtensionType,
    /// Identifier suffix; with the domain forms a unique name.
    pub extension_name: String,
    /// Set once a code verified.
    pub email_verified: bool,
    /// Live or consumed verification challenge.
    pub challenge: Option<VerificationChallenge>,
    /// Provider customer id, unique across developers.
    pub payment_customer_id: Option<String>,
    /// Most recent checkout session.
    pub checkout_session_id: Option<String>,
    /// Recorded subscription, once paid.
    pub subscription: Option<SubscriptionRecord>,
    /// Onboarding state and its transition log.
    pub lifecycle: OnboardingLifecycle,
    /// Registration time.
    pub created_at: Timestamp,
    /// Last write.
    pub updated_at: Timestamp,
}

impl DeveloperRecord {
    /// Logical name of the developer's identifier: `<domain>.<extension>`.
    pub fn identifier_name(&self) -> String {
        format!("{}.{}", self.domain_name, self.extension_name)
    }

    /// Profile lookup name: `<domain>.<m|s>`.
    pub fn profile_name(&self) -> String {
        format!("{}.{}", self.domain_name, self.extension_type.profile_suffix())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> OnboardingState {
        self.lifecycle.state()
    }

    /// Public projection.
    pub fn summary(&self) -> DeveloperSummary {
        DeveloperSummary {
            id: self.id,
            email: self.email.clone(),
            domain_name: self.domain_name.clone(),
            extension_type: self.extension_type,
            email_verified: self.email_verified,
            state: self.state(),
        }
    }
}

/// Public projection of a developer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperSummary {
    /// Developer id.
    pub id: DeveloperId,
    /// Email.
    pub email: Email,
    /// Domain label.
    pub domain_name: String,
    /// Extension kind.
    pub extension_type: ExtensionType,
    /// Whether the email is verified.
    pub email_verified: bool,
    /// Onboarding state.
    pub state: OnboardingState,
}

/// Public profile, with the developer's credential if one was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    /// Profile fields, flattened.
    #[serde(flatten)]
    pub profile: DeveloperProfile,
    /// Contact email.
    pub email: Email,
    /// Domain label.
    pub domain_name: String,
    /// Extension kind.
    pub extension_type: ExtensionType,
    /// Identifier suffix.
    pub extension_name: String,
    /// Newest credential, compact form.
    pub credential_jwt: Option<String>,
    /// Id of the newest credential.
    pub credential_id: Option<CredentialId>,
}

/// A registry entry for one decentralized identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierRecord {
    /// Unique logical name, `<domain>.<extension>`.
    pub name: String,
    /// The DID.
    pub uri: Did,
    /// Resolved DID document.
    pub document: serde_json::Value,
    /// Owning developer, if any.
    pub owner: Option<DeveloperId>,
    /// Kind of subject.
    pub identifier_type: IdentifierType,
    /// Lifecycle status.
    pub status: IdentifierStatus,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last write.
    pub updated_at: Timestamp,
}

impl IdentifierRecord {
    /// Public projection; the document is withheld.
    pub fn view(&self) -> IdentifierView {
        IdentifierView {
            name: self.name.clone(),
            uri: self.uri.clone(),
            identifier_type: self.identifier_type,
            status: self.status,
        }
    }
}

/// Public projection of an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierView {
    /// Logical name.
    pub name: String,
    /// The DID.
    pub uri: Did,
    /// Kind of subject.
    pub identifier_type: IdentifierType,
    /// Lifecycle status.
    pub status: IdentifierStatus,
}

/// An issued verifiable credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// The credential's own data model id.
    pub id: CredentialId,
    /// Issuer DID.
    pub issuer: Did,
    /// Subject DID.
    pub subject: Did,
    /// Start of validity.
    pub issuance_date: Timestamp,
    /// End of validity.
    pub expiration_date: Timestamp,
    /// Credential type name.
    pub credential_type: String,
    /// Full credential.
    pub credential: VerifiableCredential,
    /// Owning developer, if any.
    pub owner: Option<DeveloperId>,
    /// Compact JWS form.
    pub compact: String,
    /// Verification status.
    pub status: CredentialStatus,
    /// Unique per logical issuance (one per developer for the saga path),
    /// so concurrent continuations converge on one credential.
    pub issuance_key: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last write.
    pub updated_at: Timestamp,
}

impl CredentialRecord {
    /// Public projection.
    pub fn view(&self) -> CredentialView {
        CredentialView {
            id: self.id.clone(),
            issuer: self.issuer.clone(),
            subject: self.subject.clone(),
            issuance_date: self.issuance_date,
            expiration_date: self.expiration_date,
            credential_type: self.credential_type.clone(),
            status: self.status,
        }
    }
}

/// Public projection of a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialView {
    /// Credential id.
    pub id: CredentialId,
    /// Issuer DID.
    pub issuer: Did,
    /// Subject DID.
    pub subject: Did,
    /// Start of validity.
    pub issuance_date: Timestamp,
    /// End of validity.
    pub expiration_date: Timestamp,
    /// Credential type name.
    #[serde(rename = "type")]
    pub credential_type: String,
    /// Verification status.
    pub status: CredentialStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_type_parsing() {
        assert_eq!("AI".parse::<ExtensionType>().unwrap(), ExtensionType::Ai);
        assert_eq!(" service ".parse::<ExtensionType>().unwrap(), ExtensionType::Service);
        assert!("robot".parse::<ExtensionType>().is_err());
    }

    #[test]
    fn extension_type_maps_to_identifier_type() {
        assert_eq!(ExtensionType::Ai.identifier_type(), IdentifierType::Device);
        assert_eq!(ExtensionType::Service.identifier_type(), IdentifierType::Service);
    }

    #[test]
    fn profile_suffixes() {
        assert_eq!(ExtensionType::from_profile_suffix("m"), ExtensionType::Ai);
        assert_eq!(ExtensionType::from_profile_suffix("s"), ExtensionType::Service);
        assert_eq!(ExtensionType::from_profile_suffix("anything"), ExtensionType::Service);
        assert_eq!(ExtensionType::Ai.profile_suffix(), "m");
    }

    #[test]
    fn wire_names() {
        assert_eq!(serde_json::to_string(&PlanType::Premium).unwrap(), "\"premium\"");
        assert_eq!(serde_json::to_string(&IdentifierType::Device).unwrap(), "\"device\"");
        let req: RegistrationRequest = serde_json::from_value(serde_json::json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "domainName": "analytical",
            "extensionType": "ai",
            "linkedIn": "https://linkedin.com/in/ada"
        }))
        .unwrap();
        assert_eq!(req.linked_in.as_deref(), Some("https://linkedin.com/in/ada"));
        assert!(req.extension_name.is_none());
    }
}
