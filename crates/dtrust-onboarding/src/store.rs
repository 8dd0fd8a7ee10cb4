//! # Onboarding Store
//!
//! Persistence trait with uniqueness constraints, and an in-memory
//! implementation.
//!
//! Unique keys:
//!
//! | Entity | Keys |
//! |---|---|
//! | developer | email, payment customer id, identifier name |
//! | identifier | name, URI |
//! | credential | id, issuance key |
//!
//! An insert that would violate a key fails with [`StoreError::Conflict`].
//! Updates replace the whole record and re-check the keys that may change.
//!
//! Read-modify-write on a developer goes through
//! [`OnboardingStore::modify_developer`], which applies the change to the
//! latest committed record under the store's write lock. Two concurrent
//! writers therefore never overwrite each other's fields, and a lifecycle
//! already advanced by one writer is never moved back by another.

use std::collections::HashMap;

use dtrust_core::{CredentialId, DeveloperId, Did, Email, Timestamp};
use dtrust_crypto::CodeHash;
use parking_lot::RwLock;

use crate::model::{CredentialRecord, DeveloperRecord, ExtensionType, IdentifierRecord};

/// Persistence failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A unique key is already taken.
    #[error("{entity} {key} already exists")]
    Conflict {
        /// Entity kind.
        entity: &'static str,
        /// The colliding key value.
        key: String,
    },
    /// Update of a record that does not exist.
    #[error("{entity} {key} not found")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// The missing key value.
        key: String,
    },
    /// The backend failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Record persistence consumed by the saga.
pub trait OnboardingStore: Send + Sync {
    /// Insert a new developer.
    fn insert_developer(&self, record: DeveloperRecord) -> Result<(), StoreError>;
    /// Replace an existing developer.
    fn update_developer(&self, record: &DeveloperRecord) -> Result<(), StoreError>;
    /// Apply `change` to the latest stored developer atomically and return
    /// the resulting record. `change` returns whether to write; on `false`
    /// the stored record is returned untouched.
    fn modify_developer(
        &self,
        id: &DeveloperId,
        change: &mut dyn FnMut(&mut DeveloperRecord) -> bool,
    ) -> Result<DeveloperRecord, StoreError>;
    /// Swap the developer's challenge hash for the never-matching sentinel
    /// if it still equals `expected`. Exactly one caller per code sees
    /// `true`.
    fn consume_challenge(&self, id: &DeveloperId, expected: &CodeHash) -> Result<bool, StoreError> {
        let mut consumed = false;
        self.modify_developer(id, &mut |developer| {
            match developer.challenge.as_mut() {
                Some(challenge)
                    if !challenge.code_hash.is_invalidated() && challenge.code_hash == *expected =>
                {
                    challenge.code_hash = CodeHash::invalidated();
                    developer.updated_at = Timestamp::now();
                    consumed = true;
                    true
                }
                _ => false,
            }
        })?;
        Ok(consumed)
    }
    /// Developer by id.
    fn developer(&self, id: &DeveloperId) -> Result<Option<DeveloperRecord>, StoreError>;
    /// Developer by email.
    fn developer_by_email(&self, email: &Email) -> Result<Option<DeveloperRecord>, StoreError>;
    /// Developer by payment customer id.
    fn developer_by_customer(&self, customer_id: &str)
        -> Result<Option<DeveloperRecord>, StoreError>;
    /// Developer holding the identifier name `<domain>.<extension name>`.
    fn developer_by_identifier_name(&self, name: &str)
        -> Result<Option<DeveloperRecord>, StoreError>;
    /// Developer by domain name and extension type.
    fn developer_by_domain(
        &self,
        domain_name: &str,
        extension_type: ExtensionType,
    ) -> Result<Option<DeveloperRecord>, StoreError>;

    /// Insert a new identifier.
    fn insert_identifier(&self, record: IdentifierRecord) -> Result<(), StoreError>;
    /// Replace an existing identifier (matched by URI).
    fn update_identifier(&self, record: &IdentifierRecord) -> Result<(), StoreError>;
    /// Identifier by logical name.
    fn identifier_by_name(&self, name: &str) -> Result<Option<IdentifierRecord>, StoreError>;
    /// Identifier by URI.
    fn identifier_by_uri(&self, uri: &Did) -> Result<Option<IdentifierRecord>, StoreError>;
    /// Identifiers whose name contains `needle` (case-insensitive), sorted
    /// by name, at most `limit`.
    fn search_identifiers(
        &self,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<IdentifierRecord>, StoreError>;

    /// Insert a new credential.
    fn insert_credential(&self, record: CredentialRecord) -> Result<(), StoreError>;
    /// Replace an existing credential.
    fn update_credential(&self, record: &CredentialRecord) -> Result<(), StoreError>;
    /// Credential by id.
    fn credential(&self, id: &CredentialId) -> Result<Option<CredentialRecord>, StoreError>;
    /// Credential by issuance key.
    fn credential_by_issuance_key(&self, key: &str)
        -> Result<Option<CredentialRecord>, StoreError>;
    /// Credentials owned by a developer, newest first.
    fn credentials_for(&self, owner: &DeveloperId) -> Result<Vec<CredentialRecord>, StoreError>;
}

/// [`OnboardingStore::modify_developer`] with a fallible change. An error
/// from `change` aborts the write and is returned as is.
pub fn modify_developer_with<E: From<StoreError>>(
    store: &dyn OnboardingStore,
    id: &DeveloperId,
    mut change: impl FnMut(&mut DeveloperRecord) -> Result<bool, E>,
) -> Result<DeveloperRecord, E> {
    let mut failure = None;
    let record = store.modify_developer(id, &mut |developer| match change(developer) {
        Ok(write) => write,
        Err(e) => {
            failure = Some(e);
            false
        }
    })?;
    match failure {
        Some(e) => Err(e),
        None => Ok(record),
    }
}

#[derive(Default)]
struct Tables {
    developers: HashMap<DeveloperId, DeveloperRecord>,
    developer_by_email: HashMap<Email, DeveloperId>,
    developer_by_customer: HashMap<String, DeveloperId>,
    developer_by_name: HashMap<String, DeveloperId>,
    identifiers: HashMap<Did, IdentifierRecord>,
    identifier_by_name: HashMap<String, Did>,
    credentials: HashMap<CredentialId, CredentialRecord>,
    credential_by_key: HashMap<String, CredentialId>,
}

/// In-memory [`OnboardingStore`]. Every check-and-write happens under one
/// write lock, so unique keys hold under concurrent writers.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of developers.
    pub fn developer_count(&self) -> usize {
        self.tables.read().developers.len()
    }

    /// Number of identifiers.
    pub fn identifier_count(&self) -> usize {
        self.tables.read().identifiers.len()
    }

    /// Number of credentials.
    pub fn credential_count(&self) -> usize {
        self.tables.read().credentials.len()
    }
}

fn conflict(entity: &'static str, key: impl ToString) -> StoreError {
    StoreError::Conflict {
        entity,
        key: key.to_string(),
    }
}

fn not_found(entity: &'static str, key: impl ToString) -> StoreError {
    StoreError::NotFound {
        entity,
        key: key.to_string(),
    }
}

impl Tables {
    /// Replace a stored developer, re-indexing keys that changed.
    fn replace_developer(&mut self, record: &DeveloperRecord) -> Result<(), StoreError> {
        let previous = self
            .developers
            .get(&record.id)
            .cloned()
            .ok_or_else(|| not_found("developer", record.id))?;
        if previous.email != record.email && self.developer_by_email.contains_key(&record.email) {
            return Err(conflict("developer", record.email.as_str()));
        }
        let (old_name, new_name) = (previous.identifier_name(), record.identifier_name());
        if old_name != new_name && self.developer_by_name.contains_key(&new_name) {
            return Err(conflict("identifier name", new_name));
        }
        if previous.payment_customer_id != record.payment_customer_id {
            if let Some(customer) = record.payment_customer_id.as_ref() {
                match self.developer_by_customer.get(customer) {
                    Some(owner) if *owner != record.id => {
                        return Err(conflict("payment customer", customer));
                    }
                    _ => {}
                }
            }
            if let Some(old) = previous.payment_customer_id.as_ref() {
                self.developer_by_customer.remove(old);
            }
            if let Some(customer) = record.payment_customer_id.as_ref() {
                self.developer_by_customer.insert(customer.clone(), record.id);
            }
        }
        if previous.email != record.email {
            self.developer_by_email.remove(&previous.email);
            self.developer_by_email.insert(record.email.clone(), record.id);
        }
        if old_name != new_name {
            self.developer_by_name.remove(&old_name);
            self.developer_by_name.insert(new_name, record.id);
        }
        self.developers.insert(record.id, record.clone());
        Ok(())
    }
}

impl OnboardingStore for MemoryStore {
    fn insert_developer(&self, record: DeveloperRecord) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        if t.developers.contains_key(&record.id) {
            return Err(conflict("developer", record.id));
        }
        if t.developer_by_email.contains_key(&record.email) {
            return Err(conflict("developer", record.email.as_str()));
        }
        let name = record.identifier_name();
        if t.developer_by_name.contains_key(&name) {
            return Err(conflict("identifier name", name));
        }
        if let Some(customer) = record.payment_customer_id.as_ref() {
            if t.developer_by_customer.contains_key(customer) {
                return Err(conflict("payment customer", customer));
            }
            t.developer_by_customer.insert(customer.clone(), record.id);
        }
        t.developer_by_name.insert(name, record.id);
        t.developer_by_email.insert(record.email.clone(), record.id);
        t.developers.insert(record.id, record);
        Ok(())
    }

    fn update_developer(&self, record: &DeveloperRecord) -> Result<(), StoreError> {
        self.tables.write().replace_developer(record)
    }

    fn modify_developer(
        &self,
        id: &DeveloperId,
        change: &mut dyn FnMut(&mut DeveloperRecord) -> bool,
    ) -> Result<DeveloperRecord, StoreError> {
        let mut t = self.tables.write();
        let mut record = t
            .developers
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("developer", id))?;
        if change(&mut record) {
            t.replace_developer(&record)?;
        }
        Ok(record)
    }

    fn developer(&self, id: &DeveloperId) -> Result<Option<DeveloperRecord>, StoreError> {
        Ok(self.tables.read().developers.get(id).cloned())
    }

    fn developer_by_email(&self, email: &Email) -> Result<Option<DeveloperRecord>, StoreError> {
        let t = self.tables.read();
        Ok(t.developer_by_email
            .get(email)
            .and_then(|id| t.developers.get(id))
            .cloned())
    }

    fn developer_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<DeveloperRecord>, StoreError> {
        let t = self.tables.read();
        Ok(t.developer_by_customer
            .get(customer_id)
            .and_then(|id| t.developers.get(id))
            .cloned())
    }

    fn developer_by_identifier_name(
        &self,
        name: &str,
    ) -> Result<Option<DeveloperRecord>, StoreError> {
        let t = self.tables.read();
        Ok(t.developer_by_name
            .get(name)
            .and_then(|id| t.developers.get(id))
            .cloned())
    }

    fn developer_by_domain(
        &self,
        domain_name: &str,
        extension_type: ExtensionType,
    ) -> Result<Option<DeveloperRecord>, StoreError> {
        let t = self.tables.read();
        let mut matches: Vec<&DeveloperRecord> = t
            .developers
            .values()
            .filter(|d| d.domain_name == domain_name && d.extension_type == extension_type)
            .collect();
        // Oldest registration wins when a domain was registered twice.
        matches.sort_by_key(|d| d.created_at);
        Ok(matches.first().map(|d| (*d).clone()))
    }

    fn insert_identifier(&self, record: IdentifierRecord) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        if t.identifier_by_name.contains_key(&record.name) {
            return Err(conflict("identifier", &record.name));
        }
        if t.identifiers.contains_key(&record.uri) {
            return Err(conflict("identifier", &record.uri));
        }
        t.identifier_by_name
            .insert(record.name.clone(), record.uri.clone());
        t.identifiers.insert(record.uri.clone(), record);
        Ok(())
    }

    fn update_identifier(&self, record: &IdentifierRecord) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        let previous = t
            .identifiers
            .get(&record.uri)
            .ok_or_else(|| not_found("identifier", &record.uri))?;
        if previous.name != record.name {
            return Err(StoreError::Backend(format!(
                "identifier {} cannot be renamed",
                record.uri
            )));
        }
        t.identifiers.insert(record.uri.clone(), record.clone());
        Ok(())
    }

    fn identifier_by_name(&self, name: &str) -> Result<Option<IdentifierRecord>, StoreError> {
        let t = self.tables.read();
        Ok(t.identifier_by_name
            .get(name)
            .and_then(|uri| t.identifiers.get(uri))
            .cloned())
    }

    fn identifier_by_uri(&self, uri: &Did) -> Result<Option<IdentifierRecord>, StoreError> {
        Ok(self.tables.read().identifiers.get(uri).cloned())
    }

    fn search_identifiers(
        &self,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<IdentifierRecord>, StoreError> {
        let needle = needle.to_lowercase();
        let t = self.tables.read();
        let mut found: Vec<IdentifierRecord> = t
            .identifiers
            .values()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found.truncate(limit);
        Ok(found)
    }

    fn insert_credential(&self, record: CredentialRecord) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        if t.credentials.contains_key(&record.id) {
            return Err(conflict("credential", &record.id));
        }
        if let Some(key) = record.issuance_key.as_ref() {
            if t.credential_by_key.contains_key(key) {
                return Err(conflict("credential issuance", key));
            }
            t.credential_by_key.insert(key.clone(), record.id.clone());
        }
        t.credentials.insert(record.id.clone(), record);
        Ok(())
    }

    fn update_credential(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        let previous = t
            .credentials
            .get(&record.id)
            .ok_or_else(|| not_found("credential", &record.id))?;
        if previous.issuance_key != record.issuance_key {
            return Err(StoreError::Backend(format!(
                "credential {} issuance key is immutable",
                record.id
            )));
        }
        t.credentials.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn credential(&self, id: &CredentialId) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.tables.read().credentials.get(id).cloned())
    }

    fn credential_by_issuance_key(
        &self,
        key: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let t = self.tables.read();
        Ok(t.credential_by_key
            .get(key)
            .and_then(|id| t.credentials.get(id))
            .cloned())
    }

    fn credentials_for(&self, owner: &DeveloperId) -> Result<Vec<CredentialRecord>, StoreError> {
        let mut owned: Vec<CredentialRecord> = self
            .tables
            .read()
            .credentials
            .values()
            .filter(|c| c.owner.as_ref() == Some(owner))
            .cloned()
            .collect();
        owned.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(owned)
    }
}
