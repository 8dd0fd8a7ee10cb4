#![deny(missing_docs)]

//! # dtrust-onboarding: Developer Onboarding Saga
//!
//! Sequences registration, email verification, payment confirmation,
//! identifier creation and credential issuance across three independent
//! collaborators (payment provider, identity/credential registries, mail)
//! with no distributed transaction binding them.
//!
//! ## Components
//!
//! - [`verification::VerificationCodeManager`]: single-use, time-boxed codes.
//! - [`identity::IdentityIssuer`]: check-then-create identifiers, unique by
//!   name and URI.
//! - [`credential::CredentialIssuer`]: signed credentials with validity
//!   windows and a replay-bounded confirmation flow.
//! - [`subscription::SubscriptionCoordinator`]: checkout sessions and
//!   payment confirmation with plan types from a [`config::PlanCatalog`].
//! - [`saga::OnboardingSaga`]: the entry points, each returning an
//!   [`Outcome`] instead of a `Result`.
//!
//! ## Convergent idempotency
//!
//! Every step checks the persisted record before acting and the
//! [`store::OnboardingStore`] enforces unique keys. A writer that loses a
//! race observes [`store::StoreError::Conflict`], re-reads, and continues
//! from the winner's record. Re-running a step whose effect is already
//! persisted is a no-op.
//!
//! ## Blocking
//!
//! All collaborator calls block. Async callers run saga entry points on
//! `spawn_blocking`. No store lock is held across a collaborator call.

pub mod config;
pub mod credential;
pub mod error;
pub mod identity;
pub mod model;
pub mod notifications;
pub mod outcome;
pub mod saga;
pub mod store;
pub mod subscription;
pub mod verification;

pub use config::{OnboardingConfig, PlanCatalog, PlanEntry, ValidityPolicy};
pub use error::{Collaborator, ErrorKind, OnboardingError};
pub use model::{
    CredentialRecord, CredentialView, DeveloperRecord, DeveloperSummary, ExtensionType,
    IdentifierRecord, IdentifierType, IdentifierView, PlanType, PublicProfile,
    RegistrationRequest, SubscriptionRecord,
};
pub use outcome::{Outcome, SagaStep};
pub use saga::{Collaborators, OnboardingSaga};
pub use store::{MemoryStore, OnboardingStore, StoreError};
