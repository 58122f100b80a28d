//! Credential store contract consumed by the auth service

use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::types::StoreError;

/// Stored credential for one identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub id: Uuid,
    pub identity: String,
    pub password_hash: String,
    pub second_factor: bool,
}

/// Account fields written at registration
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub second_factor: bool,
}

/// Persistence for identity -> hash mappings
///
/// `find_by_identity` distinguishes "not found" (`Ok(None)`) from a storage
/// failure (`Err`), so callers can map them to different statuses.
pub trait CredentialStore: Send + Sync {
    fn find_by_identity(&self, identity: &str) -> Result<Option<CredentialRecord>, StoreError>;

    /// Insert a new account, failing with `Duplicate` if the identity exists
    fn insert(&self, account: NewAccount) -> Result<Uuid, StoreError>;
}

/// HashMap-backed store
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    records: RwLock<HashMap<String, CredentialRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn find_by_identity(&self, identity: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Storage(format!("Lock poisoned: {}", e)))?;
        Ok(records.get(identity).cloned())
    }

    fn insert(&self, account: NewAccount) -> Result<Uuid, StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Storage(format!("Lock poisoned: {}", e)))?;

        if records.contains_key(&account.email) {
            return Err(StoreError::Duplicate(account.email));
        }

        let id = Uuid::new_v4();
        records.insert(
            account.email.clone(),
            CredentialRecord {
                id,
                identity: account.email,
                password_hash: account.password_hash,
                second_factor: account.second_factor,
            },
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(email: &str) -> NewAccount {
        NewAccount {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password_hash: "$argon2id$fake".into(),
            second_factor: false,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let store = MemoryCredentialStore::new();
        let id = store.insert(account("a@x.com")).unwrap();

        let record = store.find_by_identity("a@x.com").unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.password_hash, "$argon2id$fake");
        assert!(store.find_by_identity("b@x.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let store = MemoryCredentialStore::new();
        store.insert(account("a@x.com")).unwrap();
        assert!(matches!(
            store.insert(account("a@x.com")),
            Err(StoreError::Duplicate(_))
        ));
        assert_eq!(store.len(), 1);
    }
}
