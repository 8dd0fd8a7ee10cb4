//! # Developer Onboarding Lifecycle
//!
//! ```text
//! Registered ─▶ CodeIssued ─▶ EmailVerified ─▶ PaymentPending ─▶ Subscribed ─▶ IdentifierIssued ─▶ CredentialIssued
//!                                  │                  │               ▲               ▲
//!                                  ├──────────────────┼───────────────┘               │
//!                                  │                  └───────────────────────────────┤
//!                                  └──────────────────────────────────────────────────┘
//! ```
//!
//! States are totally ordered. A transition to a state at or below the
//! current one is `Unchanged`. Forward transitions must follow an edge of
//! the diagram; `EmailVerified → Subscribed` covers a checkout whose
//! session id was never recorded, and the two edges into
//! `IdentifierIssued` that skip `Subscribed` cover operator direct
//! issuance without payment.

use dtrust_core::{StateTransitionError, Timestamp};
use serde::{Deserialize, Serialize};

use crate::Transition;

const MACHINE: &str = "onboarding";

/// Where a developer is in the onboarding pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OnboardingState {
    /// Record created.
    Registered,
    /// A verification code has been issued.
    CodeIssued,
    /// Email ownership proven; payment customer exists.
    EmailVerified,
    /// A checkout session has been recorded.
    PaymentPending,
    /// Payment confirmed and subscription persisted.
    Subscribed,
    /// Decentralized identifier created.
    IdentifierIssued,
    /// Credential issued (terminal success).
    CredentialIssued,
}

impl OnboardingState {
    /// Whether this is the terminal success state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CredentialIssued)
    }

    /// Whether the developer has proven email ownership.
    pub fn is_email_verified(&self) -> bool {
        *self >= Self::EmailVerified
    }

    /// Whether `self → to` is an edge of the lifecycle.
    pub fn can_advance_to(&self, to: OnboardingState) -> bool {
        use OnboardingState::*;
        matches!(
            (self, to),
            (Registered, CodeIssued)
                | (CodeIssued, EmailVerified)
                | (EmailVerified, PaymentPending)
                | (EmailVerified, Subscribed)
                | (PaymentPending, Subscribed)
                | (EmailVerified, IdentifierIssued)
                | (PaymentPending, IdentifierIssued)
                | (Subscribed, IdentifierIssued)
                | (IdentifierIssued, CredentialIssued)
        )
    }
}

impl std::fmt::Display for OnboardingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Registered => "REGISTERED",
            Self::CodeIssued => "CODE_ISSUED",
            Self::EmailVerified => "EMAIL_VERIFIED",
            Self::PaymentPending => "PAYMENT_PENDING",
            Self::Subscribed => "SUBSCRIBED",
            Self::IdentifierIssued => "IDENTIFIER_ISSUED",
            Self::CredentialIssued => "CREDENTIAL_ISSUED",
        };
        f.write_str(s)
    }
}

/// Record of an onboarding transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingTransitionRecord {
    /// State before the transition.
    pub from_state: OnboardingState,
    /// State after the transition.
    pub to_state: OnboardingState,
    /// When the transition occurred.
    pub timestamp: Timestamp,
    /// Saga step that caused it.
    pub reason: String,
}

/// The persisted lifecycle of one developer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingLifecycle {
    /// Current state.
    pub state: OnboardingState,
    /// Ordered log of applied transitions.
    pub transitions: Vec<OnboardingTransitionRecord>,
}

impl Default for OnboardingLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl OnboardingLifecycle {
    /// A freshly registered developer.
    pub fn new() -> Self {
        Self {
            state: OnboardingState::Registered,
            transitions: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> OnboardingState {
        self.state
    }

    /// Whether `target` has been reached or passed.
    pub fn has_reached(&self, target: OnboardingState) -> bool {
        self.state >= target
    }

    /// Advance to `target`.
    ///
    /// # Errors
    ///
    /// [`StateTransitionError::InvalidTransition`] when `target` is ahead of
    /// the current state but not adjacent to it.
    pub fn advance_to(
        &mut self,
        target: OnboardingState,
        reason: &str,
    ) -> Result<Transition, StateTransitionError> {
        if self.has_reached(target) {
            return Ok(Transition::Unchanged);
        }
        if !self.state.can_advance_to(target) {
            return Err(StateTransitionError::InvalidTransition {
                machine: MACHINE,
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }
        self.transitions.push(OnboardingTransitionRecord {
            from_state: self.state,
            to_state: target,
            timestamp: Timestamp::now(),
            reason: reason.to_string(),
        });
        self.state = target;
        Ok(Transition::Applied)
    }
}
