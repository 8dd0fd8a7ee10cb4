#![deny(missing_docs)]

//! # dtrust-state: Lifecycle State Machines
//!
//! - **Onboarding** (`onboarding.rs`): the developer lifecycle
//!   `Registered → CodeIssued → EmailVerified → PaymentPending → Subscribed
//!   → IdentifierIssued → CredentialIssued`, persisted explicitly on the
//!   developer record so that resumption branches on state.
//!
//! - **Identifier** (`identifier.rs`): `Created → Active → {Revoked, Expired}`.
//!
//! - **Credential** (`credential.rs`): `UnVerified → Verified →
//!   {Revoked, Expired}`.
//!
//! ## Level-triggered transitions
//!
//! Re-applying a transition whose target has already been reached returns
//! [`Transition::Unchanged`] instead of an error. Callers that re-run a
//! saga step after a crash or a duplicate delivery therefore converge
//! without special-casing.

pub mod credential;
pub mod identifier;
pub mod onboarding;

pub use credential::CredentialStatus;
pub use identifier::IdentifierStatus;
pub use onboarding::{OnboardingLifecycle, OnboardingState, OnboardingTransitionRecord};

/// Result of applying a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state changed.
    Applied,
    /// The target had already been reached; nothing changed.
    Unchanged,
}

impl Transition {
    /// Whether the state changed.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}
