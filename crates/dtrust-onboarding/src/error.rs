//! # Onboarding Errors
//!
//! Five kinds. `Validation` and `Conflict` reach the caller with their
//! specific reason. `Upstream` carries collaborator detail for logs only;
//! callers see [`OnboardingError::public_message`].

use dtrust_core::{StateTransitionError, ValidationError};
use dtrust_gateway::GatewayError;
use dtrust_vc::RegistryError;

use crate::store::StoreError;

/// External system an upstream failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    /// Billing provider.
    PaymentProvider,
    /// Decentralized identifier registry.
    IdentityRegistry,
    /// Credential signing and verification.
    CredentialRegistry,
    /// Outbound mail.
    Notification,
    /// Persistence backend.
    Store,
}

impl std::fmt::Display for Collaborator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PaymentProvider => "payment provider",
            Self::IdentityRegistry => "identity registry",
            Self::CredentialRegistry => "credential registry",
            Self::Notification => "notification service",
            Self::Store => "record store",
        };
        f.write_str(s)
    }
}

/// Error kind, for transports that map outcomes to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; rejected before any collaborator call.
    Validation,
    /// Uniqueness violation.
    Conflict,
    /// Referenced entity missing.
    NotFound,
    /// Collaborator failure or timeout.
    Upstream,
    /// Code or replay window lapsed.
    Expired,
}

impl ErrorKind {
    /// Stable lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Upstream => "upstream",
            Self::Expired => "expired",
        }
    }
}

/// A failed onboarding operation.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    /// Malformed input.
    #[error("{0}")]
    Validation(String),

    /// Uniqueness violation on email, identifier or credential.
    #[error("{0}")]
    Conflict(String),

    /// Referenced developer, identifier, session or credential is missing.
    #[error("{0} not found")]
    NotFound(String),

    /// A collaborator failed.
    #[error("{collaborator} failed: {detail}")]
    Upstream {
        /// Which collaborator.
        collaborator: Collaborator,
        /// Full detail, for logs.
        detail: String,
    },

    /// A verification code or replay window lapsed.
    #[error("{0}")]
    Expired(String),
}

impl OnboardingError {
    /// Build an upstream error.
    pub fn upstream(collaborator: Collaborator, detail: impl std::fmt::Display) -> Self {
        Self::Upstream {
            collaborator,
            detail: detail.to_string(),
        }
    }

    /// The error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::Expired(_) => ErrorKind::Expired,
        }
    }

    /// Message safe to return to an end user.
    pub fn public_message(&self) -> String {
        match self {
            Self::Upstream { collaborator, .. } => format!("{collaborator} is unavailable"),
            other => other.to_string(),
        }
    }

    /// Map a payment provider failure. Missing upstream objects become
    /// `NotFound`; everything else is `Upstream`.
    pub(crate) fn from_payment(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound { resource, id } => Self::NotFound(format!("{resource} {id}")),
            other => Self::upstream(Collaborator::PaymentProvider, other),
        }
    }

    /// Map a registry failure. `Rejected` becomes `Validation` because the
    /// registry refuses only on malformed input.
    pub(crate) fn from_registry(collaborator: Collaborator, err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(what) => Self::NotFound(what),
            RegistryError::Rejected(reason) => Self::Validation(reason),
            RegistryError::Unavailable(detail) => Self::upstream(collaborator, detail),
        }
    }
}

impl From<ValidationError> for OnboardingError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StateTransitionError> for OnboardingError {
    fn from(err: StateTransitionError) -> Self {
        Self::Conflict(err.to_string())
    }
}

impl From<StoreError> for OnboardingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { entity, key } => {
                Self::Conflict(format!("{entity} {key} already exists"))
            }
            StoreError::NotFound { entity, key } => Self::NotFound(format!("{entity} {key}")),
            StoreError::Backend(detail) => Self::upstream(Collaborator::Store, detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_detail_is_not_public() {
        let err = OnboardingError::upstream(
            Collaborator::PaymentProvider,
            "create_customer returned 500: stripe internal trace id abc",
        );
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(err.public_message(), "payment provider is unavailable");
        assert!(err.to_string().contains("trace id abc"));
    }

    #[test]
    fn validation_and_conflict_are_public() {
        let err = OnboardingError::Conflict("developer already exists".into());
        assert_eq!(err.public_message(), "developer already exists");
        let err = OnboardingError::NotFound("developer".into());
        assert_eq!(err.public_message(), "developer not found");
    }

    #[test]
    fn store_conflict_maps_to_conflict() {
        let err: OnboardingError = StoreError::Conflict {
            entity: "identifier",
            key: "acme.ai".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "identifier acme.ai already exists");
    }

    #[test]
    fn payment_not_found_is_not_upstream() {
        let err = OnboardingError::from_payment(GatewayError::NotFound {
            resource: "checkout session",
            id: "cs_1".into(),
        });
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn registry_rejection_is_validation() {
        let err = OnboardingError::from_registry(
            Collaborator::CredentialRegistry,
            RegistryError::Rejected("bad window".into()),
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
