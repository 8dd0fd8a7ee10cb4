//! Tagged results of saga entry points.

use crate::error::{ErrorKind, OnboardingError};

/// A named step of the saga, used in partial outcomes and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SagaStep {
    /// Developer registration.
    Register,
    /// Challenge generation and storage.
    IssueChallenge,
    /// Delivery of the code mail.
    DispatchCode,
    /// Code check and email verification.
    VerifyChallenge,
    /// Payment customer creation.
    CreateCustomer,
    /// Checkout session creation upstream.
    CreateCheckout,
    /// Recording the session id on the developer.
    RecordCheckout,
    /// Payment status and subscription retrieval.
    ConfirmPayment,
    /// Writing the subscription snapshot.
    PersistSubscription,
    /// Identifier creation.
    CreateIdentifier,
    /// Credential issuance.
    IssueCredential,
    /// Lifecycle bookkeeping after issuance.
    RecordIssuance,
    /// Credential verification link.
    ConfirmCredential,
}

impl SagaStep {
    /// Stable snake_case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::IssueChallenge => "issue_challenge",
            Self::DispatchCode => "dispatch_code",
            Self::VerifyChallenge => "verify_challenge",
            Self::CreateCustomer => "create_customer",
            Self::CreateCheckout => "create_checkout",
            Self::RecordCheckout => "record_checkout",
            Self::ConfirmPayment => "confirm_payment",
            Self::PersistSubscription => "persist_subscription",
            Self::CreateIdentifier => "create_identifier",
            Self::IssueCredential => "issue_credential",
            Self::RecordIssuance => "record_issuance",
            Self::ConfirmCredential => "confirm_credential",
        }
    }
}

impl std::fmt::Display for SagaStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a saga entry point.
///
/// `Pending` is a legitimate, retryable state (payment not yet settled).
/// `Partial` means earlier steps committed and `failed_step` did not; the
/// committed steps are never rolled back and the caller may re-invoke to
/// resume.
#[derive(Debug)]
pub enum Outcome<T> {
    /// Every step completed (or was already complete).
    Success(T),
    /// Nothing failed, but the precondition for proceeding is not yet met.
    Pending {
        /// Why the operation is waiting.
        reason: String,
    },
    /// Some steps committed, then one failed.
    Partial {
        /// What was committed.
        value: T,
        /// The step that failed.
        failed_step: SagaStep,
        /// Caller-safe description of the failure.
        message: String,
    },
    /// The operation failed with nothing committed.
    Error(OnboardingError),
}

impl<T> Outcome<T> {
    /// Build a partial outcome from the failing step's error.
    pub fn partial(value: T, failed_step: SagaStep, err: &OnboardingError) -> Self {
        Self::Partial {
            value,
            failed_step,
            message: err.public_message(),
        }
    }

    /// Stable label: `success`, `pending`, `partial` or `error`.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Pending { .. } => "pending",
            Self::Partial { .. } => "partial",
            Self::Error(_) => "error",
        }
    }

    /// Whether this is `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The error kind, for `Error` outcomes.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Error(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// The carried value, for `Success` and `Partial`.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success(v) | Self::Partial { value: v, .. } => Some(v),
            _ => None,
        }
    }

    /// Consume into the carried value.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Success(v) | Self::Partial { value: v, .. } => Some(v),
            _ => None,
        }
    }

    /// Map the carried value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success(v) => Outcome::Success(f(v)),
            Self::Pending { reason } => Outcome::Pending { reason },
            Self::Partial {
                value,
                failed_step,
                message,
            } => Outcome::Partial {
                value: f(value),
                failed_step,
                message,
            },
            Self::Error(e) => Outcome::Error(e),
        }
    }
}

impl<T> From<Result<T, OnboardingError>> for Outcome<T> {
    fn from(result: Result<T, OnboardingError>) -> Self {
        match result {
            Ok(v) => Self::Success(v),
            Err(e) => Self::Error(e),
        }
    }
}
