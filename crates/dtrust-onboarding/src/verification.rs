//! # Verification Code Manager
//!
//! Issues and checks single-use, time-boxed one-time codes. Only the code
//! hash is stored. A developer holds at most one live challenge: issuing a
//! new code overwrites the previous one.
//!
//! Checks fail closed. The reason (no challenge, expired, mismatch) is
//! available internally for logging; callers outside this crate only see
//! a boolean.

use std::sync::Arc;

use dtrust_core::Timestamp;
use dtrust_crypto::OneTimeCode;
use dtrust_state::OnboardingState;

use crate::error::OnboardingError;
use crate::model::{DeveloperRecord, VerificationChallenge};
use crate::store::{modify_developer_with, OnboardingStore};

/// Why a check did or did not pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeCheck {
    /// The code matches a live challenge.
    Matched,
    /// No challenge is pending, or it was already used.
    NoChallenge,
    /// The challenge expired.
    Expired,
    /// The code does not match.
    Mismatch,
}

impl ChallengeCheck {
    /// Label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::NoChallenge => "no_challenge",
            Self::Expired => "expired",
            Self::Mismatch => "mismatch",
        }
    }
}

/// Issues and checks verification codes.
pub struct VerificationCodeManager {
    store: Arc<dyn OnboardingStore>,
    ttl_secs: i64,
}

impl VerificationCodeManager {
    /// Manager with the given code lifetime.
    pub fn new(store: Arc<dyn OnboardingStore>, ttl_secs: i64) -> Self {
        Self { store, ttl_secs }
    }

    /// Generate a code, store its hash and expiry on `developer`, persist,
    /// and return the plaintext for out-of-band delivery.
    pub fn issue_challenge(
        &self,
        developer: &mut DeveloperRecord,
        now: Timestamp,
    ) -> Result<OneTimeCode, OnboardingError> {
        let code = OneTimeCode::generate();
        let challenge = VerificationChallenge {
            code_hash: code.hash(),
            expires_at: now.plus_secs(self.ttl_secs),
        };
        let id = developer.id;
        *developer = modify_developer_with(self.store.as_ref(), &id, |stored| {
            stored.challenge = Some(challenge.clone());
            stored
                .lifecycle
                .advance_to(OnboardingState::CodeIssued, "issue_challenge")?;
            stored.updated_at = now;
            Ok::<_, OnboardingError>(true)
        })?;
        tracing::info!(developer_id = %developer.id, ttl_secs = self.ttl_secs, "verification code issued");
        Ok(code)
    }

    /// Check `submitted` against the developer's challenge.
    pub fn check(
        &self,
        developer: &DeveloperRecord,
        submitted: &OneTimeCode,
        now: Timestamp,
    ) -> ChallengeCheck {
        let Some(challenge) = developer.challenge.as_ref() else {
            return ChallengeCheck::NoChallenge;
        };
        if challenge.code_hash.is_invalidated() {
            return ChallengeCheck::NoChallenge;
        }
        if now > challenge.expires_at {
            return ChallengeCheck::Expired;
        }
        if challenge.code_hash.matches(submitted) {
            ChallengeCheck::Matched
        } else {
            ChallengeCheck::Mismatch
        }
    }

    /// Whether `submitted` verifies. Never errors.
    pub fn verify_challenge(
        &self,
        developer: &DeveloperRecord,
        submitted: &OneTimeCode,
        now: Timestamp,
    ) -> bool {
        self.check(developer, submitted, now) == ChallengeCheck::Matched
    }

    /// Atomically replace the stored hash with the never-matching sentinel.
    /// Runs before any side effect of a successful verification; only the
    /// caller that gets `true` may proceed.
    pub fn consume(&self, developer: &DeveloperRecord) -> Result<bool, OnboardingError> {
        let Some(challenge) = developer.challenge.as_ref() else {
            return Ok(false);
        };
        Ok(self.store.consume_challenge(&developer.id, &challenge.code_hash)?)
    }
}
