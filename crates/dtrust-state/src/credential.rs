//! # Credential Status
//!
//! ```text
//! UnVerified ──▶ Verified ──▶ Revoked (terminal)
//!     │             └───────▶ Expired (terminal)
//!     ├───────────────────────▶ Revoked
//!     └───────────────────────▶ Expired
//! ```
//!
//! `Verified` is reached only through the end-user verification flow.
//! Verifying an already-verified credential is `Unchanged`.

use dtrust_core::StateTransitionError;
use serde::{Deserialize, Serialize};

use crate::Transition;

const MACHINE: &str = "credential";

/// Status of an issued credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialStatus {
    /// Issued; the holder has not yet confirmed it.
    UnVerified,
    /// Confirmed through the verification link.
    Verified,
    /// Withdrawn by an operator (terminal).
    Revoked,
    /// Past its expiration date (terminal).
    Expired,
}

impl CredentialStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked | Self::Expired)
    }

    /// Move `self` to `target` in place.
    pub fn transition_to(&mut self, target: Self) -> Result<Transition, StateTransitionError> {
        if *self == target {
            return Ok(Transition::Unchanged);
        }
        if self.is_terminal() {
            return Err(StateTransitionError::Terminal {
                machine: MACHINE,
                state: self.to_string(),
            });
        }
        // From the two live states every other state is reachable except
        // falling back to UnVerified.
        if target == Self::UnVerified {
            return Err(StateTransitionError::InvalidTransition {
                machine: MACHINE,
                from: self.to_string(),
                to: target.to_string(),
            });
        }
        *self = target;
        Ok(Transition::Applied)
    }
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::UnVerified => "UNVERIFIED",
            Self::Verified => "VERIFIED",
            Self::Revoked => "REVOKED",
            Self::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_then_reverify_is_noop() {
        let mut status = CredentialStatus::UnVerified;
        assert_eq!(
            status.transition_to(CredentialStatus::Verified).unwrap(),
            Transition::Applied
        );
        assert_eq!(
            status.transition_to(CredentialStatus::Verified).unwrap(),
            Transition::Unchanged
        );
    }

    #[test]
    fn cannot_unverify() {
        let mut status = CredentialStatus::Verified;
        let err = status.transition_to(CredentialStatus::UnVerified).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid credential transition from VERIFIED to UNVERIFIED"
        );
    }

    #[test]
    fn revoked_cannot_be_verified() {
        let mut status = CredentialStatus::UnVerified;
        status.transition_to(CredentialStatus::Revoked).unwrap();
        let err = status.transition_to(CredentialStatus::Verified).unwrap_err();
        assert!(matches!(err, StateTransitionError::Terminal { .. }));
    }

    #[test]
    fn serde_uses_variant_names() {
        assert_eq!(
            serde_json::to_string(&CredentialStatus::UnVerified).unwrap(),
            "\"UnVerified\""
        );
    }
}
