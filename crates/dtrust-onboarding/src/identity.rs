//! # Identity Issuer
//!
//! Creates decentralized identifiers through the [`IdentityRegistry`]
//! collaborator and records them, unique by logical name and by URI.
//!
//! Creation is check-then-create: the name lookup runs before the registry
//! call, so a retried saga never mints a second identifier for the same
//! name. Registry creation is neither idempotent nor fast; when it fails
//! nothing is persisted.

use std::sync::Arc;

use dtrust_core::{DeveloperId, Did, Timestamp};
use dtrust_state::IdentifierStatus;
use dtrust_vc::IdentityRegistry;

use crate::error::{Collaborator, OnboardingError};
use crate::model::{IdentifierRecord, IdentifierType};
use crate::store::OnboardingStore;

/// Maximum length of a search query; longer input is truncated.
pub const MAX_SEARCH_QUERY_LEN: usize = 100;

/// Maximum number of search results.
pub const MAX_SEARCH_RESULTS: usize = 50;

/// Creates, resolves and looks up identifiers.
pub struct IdentityIssuer {
    store: Arc<dyn OnboardingStore>,
    registry: Arc<dyn IdentityRegistry>,
}

impl IdentityIssuer {
    /// Issuer over the given store and registry.
    pub fn new(store: Arc<dyn OnboardingStore>, registry: Arc<dyn IdentityRegistry>) -> Self {
        Self { store, registry }
    }

    /// Create an identifier named `name`.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the name (or the minted URI) is already recorded.
    /// - `Upstream` if the registry fails; nothing is persisted.
    pub fn create_identifier(
        &self,
        name: &str,
        owner: Option<DeveloperId>,
        identifier_type: IdentifierType,
    ) -> Result<IdentifierRecord, OnboardingError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OnboardingError::Validation("identifier name is required".into()));
        }
        if self.store.identifier_by_name(name)?.is_some() {
            return Err(OnboardingError::Conflict(format!(
                "identifier {name} already exists"
            )));
        }

        let material = self
            .registry
            .create()
            .map_err(|e| OnboardingError::from_registry(Collaborator::IdentityRegistry, e))?;

        let now = Timestamp::now();
        let record = IdentifierRecord {
            name: name.to_string(),
            uri: material.uri,
            document: material.document,
            owner,
            identifier_type,
            status: IdentifierStatus::Created,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_identifier(record.clone())?;
        tracing::info!(name, uri = %record.uri, "identifier created");
        Ok(record)
    }

    /// Return the identifier named `name` if it belongs to `owner`,
    /// creating it otherwise. A concurrent creator that wins the race is
    /// treated as "already exists" and its record is returned.
    ///
    /// # Errors
    ///
    /// `Conflict` when the name is held by a different owner.
    pub fn ensure_identifier(
        &self,
        name: &str,
        owner: DeveloperId,
        identifier_type: IdentifierType,
    ) -> Result<IdentifierRecord, OnboardingError> {
        if let Some(existing) = self.store.identifier_by_name(name)? {
            return Self::owned_by(existing, owner);
        }
        match self.create_identifier(name, Some(owner), identifier_type) {
            Ok(record) => Ok(record),
            Err(OnboardingError::Conflict(_)) => {
                let winner = self.store.identifier_by_name(name)?.ok_or_else(|| {
                    OnboardingError::upstream(
                        Collaborator::Store,
                        format!("identifier {name} conflicted but cannot be read back"),
                    )
                })?;
                tracing::debug!(name, "identifier created concurrently; reusing");
                Self::owned_by(winner, owner)
            }
            Err(e) => Err(e),
        }
    }

    fn owned_by(
        record: IdentifierRecord,
        owner: DeveloperId,
    ) -> Result<IdentifierRecord, OnboardingError> {
        if record.owner == Some(owner) {
            Ok(record)
        } else {
            Err(OnboardingError::Conflict(format!(
                "identifier {} is registered to another developer",
                record.name
            )))
        }
    }

    /// Re-resolve `uri` from the registry and overwrite the stored document.
    pub fn resolve_and_update(&self, uri: &Did) -> Result<IdentifierRecord, OnboardingError> {
        let mut record = self
            .store
            .identifier_by_uri(uri)?
            .ok_or_else(|| OnboardingError::NotFound(format!("identifier {uri}")))?;
        let material = self
            .registry
            .resolve(uri)
            .map_err(|e| OnboardingError::from_registry(Collaborator::IdentityRegistry, e))?;
        record.document = material.document;
        record.updated_at = Timestamp::now();
        self.store.update_identifier(&record)?;
        tracing::info!(uri = %uri, "identifier document refreshed");
        Ok(record)
    }

    /// Move an identifier to `Active`. Already active is a no-op.
    pub fn activate(&self, uri: &Did) -> Result<IdentifierRecord, OnboardingError> {
        let mut record = self.by_uri(uri)?;
        if record.status.transition_to(IdentifierStatus::Active)?.is_applied() {
            record.updated_at = Timestamp::now();
            self.store.update_identifier(&record)?;
        }
        Ok(record)
    }

    /// Identifier by URI.
    pub fn by_uri(&self, uri: &Did) -> Result<IdentifierRecord, OnboardingError> {
        self.store
            .identifier_by_uri(uri)?
            .ok_or_else(|| OnboardingError::NotFound(format!("identifier {uri}")))
    }

    /// Case-insensitive substring search on names. The query is truncated
    /// to [`MAX_SEARCH_QUERY_LEN`] characters; at most
    /// [`MAX_SEARCH_RESULTS`] records are returned.
    pub fn search(&self, query: &str) -> Result<Vec<IdentifierRecord>, OnboardingError> {
        let query: String = query.trim().chars().take(MAX_SEARCH_QUERY_LEN).collect();
        if query.is_empty() {
            return Err(OnboardingError::Validation("search query is required".into()));
        }
        Ok(self.store.search_identifiers(&query, MAX_SEARCH_RESULTS)?)
    }
}
