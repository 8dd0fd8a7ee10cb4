//! # Identifier Status
//!
//! ```text
//! Created ──▶ Active ──▶ Revoked (terminal)
//!    │           └─────▶ Expired (terminal)
//!    └──────────────────▶ Revoked
//! ```

use dtrust_core::StateTransitionError;
use serde::{Deserialize, Serialize};

use crate::Transition;

const MACHINE: &str = "identifier";

/// Registry status of a decentralized identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierStatus {
    /// Minted and persisted.
    Created,
    /// In use.
    Active,
    /// Withdrawn by an operator (terminal).
    Revoked,
    /// Past its useful life (terminal).
    Expired,
}

impl IdentifierStatus {
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
        let allowed = matches!(
            (*self, target),
            (Self::Created, Self::Active)
                | (Self::Created, Self::Revoked)
                | (Self::Active, Self::Revoked)
                | (Self::Active, Self::Expired)
        );
        if !allowed {
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

impl std::fmt::Display for IdentifierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Active => "ACTIVE",
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
    fn created_to_active_to_revoked() {
        let mut status = IdentifierStatus::Created;
        assert!(status.transition_to(IdentifierStatus::Active).unwrap().is_applied());
        assert!(status.transition_to(IdentifierStatus::Revoked).unwrap().is_applied());
        assert!(status.is_terminal());
    }

    #[test]
    fn created_cannot_expire() {
        let mut status = IdentifierStatus::Created;
        let err = status.transition_to(IdentifierStatus::Expired).unwrap_err();
        assert!(matches!(err, StateTransitionError::InvalidTransition { .. }));
        assert_eq!(status, IdentifierStatus::Created);
    }

    #[test]
    fn terminal_states_are_sticky() {
        let mut status = IdentifierStatus::Expired;
        assert_eq!(
            status.transition_to(IdentifierStatus::Expired).unwrap(),
            Transition::Unchanged
        );
        let err = status.transition_to(IdentifierStatus::Active).unwrap_err();
        assert_eq!(err.to_string(), "identifier is in terminal state EXPIRED");
    }
}
