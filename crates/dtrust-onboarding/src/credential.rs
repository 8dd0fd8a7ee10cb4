//! # Credential Issuer
//!
//! Builds, signs and records verifiable credentials through the
//! [`CredentialRegistry`] collaborator.
//!
//! ## Issuance
//!
//! 1. The validity window comes from a [`ValidityPolicy`]; a window whose
//!    expiration precedes issuance is rejected before any collaborator call.
//! 2. The registry builds the data model. A model without an id is a
//!    signing failure.
//! 3. The credential id is checked against the store, then the credential
//!    is signed and persisted as `UnVerified`.
//!
//! ## Verification
//!
//! [`CredentialIssuer::verify_credential`] is read-only. The status moves
//! to `Verified` only through [`CredentialIssuer::confirm_verification`],
//! which first rejects links whose timestamp falls outside the replay
//! window.

use std::sync::Arc;

use dtrust_core::{CredentialId, DeveloperId, Did, Timestamp};
use dtrust_state::{CredentialStatus, Transition};
use dtrust_vc::{CredentialClaims, CredentialRegistry, IssuerIdentity};
use serde_json::{Map, Value};

use crate::config::{ValidityPolicy, ValidityWindow};
use crate::error::{Collaborator, OnboardingError};
use crate::model::CredentialRecord;
use crate::store::OnboardingStore;

/// What to issue.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    /// Credential type appended after `VerifiableCredential`.
    pub credential_type: String,
    /// Issuer URI. Must be the configured issuer identity.
    pub issuer: Did,
    /// Subject URI.
    pub subject: Did,
    /// Subject claims.
    pub claims: Map<String, Value>,
    /// Owning developer.
    pub owner: Option<DeveloperId>,
    /// Unique key of the logical issuance, if any.
    pub issuance_key: Option<String>,
}

/// A freshly issued credential.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    /// The persisted record.
    pub record: CredentialRecord,
    /// Whether this call created it (false when an earlier issuance with
    /// the same key was found).
    pub newly_issued: bool,
}

/// Issues, verifies and transitions credentials.
pub struct CredentialIssuer {
    store: Arc<dyn OnboardingStore>,
    registry: Arc<dyn CredentialRegistry>,
    issuer: Arc<IssuerIdentity>,
}

impl CredentialIssuer {
    /// Issuer signing with `issuer`.
    pub fn new(
        store: Arc<dyn OnboardingStore>,
        registry: Arc<dyn CredentialRegistry>,
        issuer: Arc<IssuerIdentity>,
    ) -> Self {
        Self {
            store,
            registry,
            issuer,
        }
    }

    /// The issuer identity's DID.
    pub fn issuer_did(&self) -> &Did {
        self.issuer.did()
    }

    /// Issue with a window computed from `policy` at the current time.
    pub fn issue_credential(
        &self,
        request: IssueRequest,
        policy: ValidityPolicy,
    ) -> Result<IssuedCredential, OnboardingError> {
        self.issue_with_window(request, policy.window_from(Timestamp::now()))
    }

    /// Issue with an explicit window.
    ///
    /// # Errors
    ///
    /// - `Validation` when the window is inverted, the issuer is not the
    ///   configured identity, or the type is empty.
    /// - `Conflict` when the credential id is already recorded.
    /// - `Upstream` when the registry fails to build or sign.
    pub fn issue_with_window(
        &self,
        request: IssueRequest,
        window: ValidityWindow,
    ) -> Result<IssuedCredential, OnboardingError> {
        if window.expiration < window.issuance {
            return Err(OnboardingError::Validation(format!(
                "expirationDate {} precedes issuanceDate {}",
                window.expiration, window.issuance
            )));
        }
        if request.credential_type.trim().is_empty() {
            return Err(OnboardingError::Validation("credential type is required".into()));
        }
        if &request.issuer != self.issuer.did() {
            return Err(OnboardingError::Validation(format!(
                "issuer {} is not the configured issuer identity",
                request.issuer
            )));
        }

        let credential = self
            .registry
            .create(CredentialClaims {
                credential_type: request.credential_type.clone(),
                issuer: request.issuer.clone(),
                subject: request.subject.clone(),
                data: request.claims,
                issuance_date: window.issuance,
                expiration_date: window.expiration,
            })
            .map_err(|e| OnboardingError::from_registry(Collaborator::CredentialRegistry, e))?;

        let raw_id = credential.id.clone().ok_or_else(|| {
            OnboardingError::upstream(
                Collaborator::CredentialRegistry,
                "registry returned a credential without an id",
            )
        })?;
        let id = CredentialId::new(raw_id).map_err(|e| {
            OnboardingError::upstream(Collaborator::CredentialRegistry, e)
        })?;
        if self.store.credential(&id)?.is_some() {
            return Err(OnboardingError::Conflict(format!(
                "credential {id} already exists"
            )));
        }

        let compact = self
            .registry
            .sign(&credential, &self.issuer)
            .map_err(|e| OnboardingError::from_registry(Collaborator::CredentialRegistry, e))?;

        let now = Timestamp::now();
        let record = CredentialRecord {
            id,
            issuer: request.issuer,
            subject: request.subject,
            issuance_date: window.issuance,
            expiration_date: window.expiration,
            credential_type: request.credential_type,
            credential,
            owner: request.owner,
            compact,
            status: CredentialStatus::UnVerified,
            issuance_key: request.issuance_key,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_credential(record.clone())?;
        tracing::info!(credential_id = %record.id, subject = %record.subject, "credential issued");
        Ok(IssuedCredential {
            record,
            newly_issued: true,
        })
    }

    /// Return the credential recorded under `issuance_key`, or issue one.
    /// A concurrent issuer that wins the key is treated as "already
    /// issued" and its record returned.
    pub fn ensure_credential(
        &self,
        request: IssueRequest,
        policy: ValidityPolicy,
    ) -> Result<IssuedCredential, OnboardingError> {
        let Some(key) = request.issuance_key.clone() else {
            return self.issue_credential(request, policy);
        };
        if let Some(record) = self.store.credential_by_issuance_key(&key)? {
            return Ok(IssuedCredential {
                record,
                newly_issued: false,
            });
        }
        match self.issue_credential(request, policy) {
            Err(OnboardingError::Conflict(_)) => {
                let record = self.store.credential_by_issuance_key(&key)?.ok_or_else(|| {
                    OnboardingError::upstream(
                        Collaborator::Store,
                        format!("credential issuance {key} conflicted but cannot be read back"),
                    )
                })?;
                tracing::debug!(issuance_key = %key, "credential issued concurrently; reusing");
                Ok(IssuedCredential {
                    record,
                    newly_issued: false,
                })
            }
            other => other,
        }
    }

    /// Verify a compact credential. Read-only.
    pub fn verify_credential(&self, compact: &str) -> Result<bool, OnboardingError> {
        if compact.trim().is_empty() {
            return Err(OnboardingError::Validation("credential JWT is required".into()));
        }
        self.registry
            .verify(compact.trim())
            .map_err(|e| OnboardingError::from_registry(Collaborator::CredentialRegistry, e))
    }

    /// Confirm a verification link and mark the credential `Verified`.
    ///
    /// `timestamp` is the link's unix time in seconds. Links older than
    /// `replay_window_secs` are rejected with `Expired` before the token is
    /// even examined. Confirming an already-verified credential succeeds
    /// with [`Transition::Unchanged`].
    pub fn confirm_verification(
        &self,
        compact: &str,
        timestamp: Option<i64>,
        credential_id: &CredentialId,
        expected_owner: Option<DeveloperId>,
        replay_window_secs: i64,
    ) -> Result<(CredentialRecord, Transition), OnboardingError> {
        let now = Timestamp::now();
        if let Some(sent_at) = timestamp {
            if now.epoch_secs() - sent_at > replay_window_secs {
                return Err(OnboardingError::Expired("verification request expired".into()));
            }
        }
        if !self.verify_credential(compact)? {
            return Err(OnboardingError::Validation("credential failed verification".into()));
        }
        let mut record = self
            .store
            .credential(credential_id)?
            .ok_or_else(|| OnboardingError::NotFound(format!("credential {credential_id}")))?;
        if expected_owner.is_some() && record.owner != expected_owner {
            return Err(OnboardingError::NotFound(format!("credential {credential_id}")));
        }
        if record.compact != compact.trim() {
            return Err(OnboardingError::Validation(
                "credential JWT does not match the credential id".into(),
            ));
        }
        let transition = record.status.transition_to(CredentialStatus::Verified)?;
        if transition.is_applied() {
            record.updated_at = now;
            self.store.update_credential(&record)?;
            tracing::info!(credential_id = %record.id, "credential verified");
        }
        Ok((record, transition))
    }

    /// Revoke a credential. Revoking twice is a no-op.
    pub fn revoke(&self, credential_id: &CredentialId) -> Result<CredentialRecord, OnboardingError> {
        let mut record = self
            .store
            .credential(credential_id)?
            .ok_or_else(|| OnboardingError::NotFound(format!("credential {credential_id}")))?;
        if record.status.transition_to(CredentialStatus::Revoked)?.is_applied() {
            record.updated_at = Timestamp::now();
            self.store.update_credential(&record)?;
            tracing::warn!(credential_id = %record.id, "credential revoked");
        }
        Ok(record)
    }

    /// Credentials owned by `owner`, newest first.
    pub fn credentials_for(&self, owner: &DeveloperId) -> Result<Vec<CredentialRecord>, OnboardingError> {
        Ok(self.store.credentials_for(owner)?)
    }
}
