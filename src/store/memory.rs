//! In-memory credential store
//!
//! Used in dev mode when MongoDB is unreachable, and by tests. A single
//! write lock covers each check-and-write so uniqueness holds under
//! concurrent requests.

use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::CredentialStore;
use crate::account::Account;
use crate::types::{GatehouseError, Result};

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert(&self, account: Account) -> Result<Account> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.handle) {
            return Err(GatehouseError::Conflict("Username already exists".into()));
        }

        debug!("memory store: insert {}", account.handle);
        accounts.insert(account.handle.clone(), account.clone());
        Ok(account)
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.get(handle).cloned())
    }

    async fn rename_handle(&self, old_handle: &str, new_handle: &str) -> Result<()> {
        let mut accounts = self.accounts.write().await;

        if old_handle != new_handle && accounts.contains_key(new_handle) {
            return Err(GatehouseError::Conflict("Username already exists".into()));
        }

        let mut account = accounts
            .remove(old_handle)
            .ok_or_else(|| GatehouseError::NotFound("User not found".into()))?;

        account.handle = new_handle.to_string();
        account.updated_at = Utc::now();
        accounts.insert(account.handle.clone(), account);

        debug!("memory store: rename {} -> {}", old_handle, new_handle);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.read().await.values().cloned().collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryCredentialStore::new();
        assert_ok!(store.insert(Account::new("alice", "hash")).await);

        let found = store.find_by_handle("alice").await.unwrap().unwrap();
        assert_eq!(found.credential_hash, "hash");
        assert!(store.find_by_handle("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = MemoryCredentialStore::new();
        assert_ok!(store.insert(Account::new("alice", "h1")).await);

        let err = store.insert(Account::new("alice", "h2")).await.unwrap_err();
        assert!(matches!(err, GatehouseError::Conflict(_)));

        // Original record untouched
        assert_eq!(store.len().await, 1);
        let found = store.find_by_handle("alice").await.unwrap().unwrap();
        assert_eq!(found.credential_hash, "h1");
    }

    #[tokio::test]
    async fn test_rename() {
        let store = MemoryCredentialStore::new();
        let original = store.insert(Account::new("alice", "h1")).await.unwrap();

        assert_ok!(store.rename_handle("alice", "alice2").await);

        assert!(store.find_by_handle("alice").await.unwrap().is_none());
        let renamed = store.find_by_handle("alice2").await.unwrap().unwrap();
        assert_eq!(renamed.credential_hash, "h1");
        assert_eq!(renamed.created_at, original.created_at);
        assert!(renamed.updated_at >= original.updated_at);
    }

    #[tokio::test]
    async fn test_rename_conflict_leaves_both() {
        let store = MemoryCredentialStore::new();
        store.insert(Account::new("alice", "h1")).await.unwrap();
        store.insert(Account::new("bob", "h2")).await.unwrap();

        let err = store.rename_handle("alice", "bob").await.unwrap_err();
        assert!(matches!(err, GatehouseError::Conflict(_)));

        assert_eq!(
            store.find_by_handle("alice").await.unwrap().unwrap().credential_hash,
            "h1"
        );
        assert_eq!(
            store.find_by_handle("bob").await.unwrap().unwrap().credential_hash,
            "h2"
        );
    }

    #[tokio::test]
    async fn test_rename_missing() {
        let store = MemoryCredentialStore::new();
        let err = store.rename_handle("ghost", "ghost2").await.unwrap_err();
        assert!(matches!(err, GatehouseError::NotFound(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_rename_to_same_handle() {
        let store = MemoryCredentialStore::new();
        store.insert(Account::new("alice", "h1")).await.unwrap();
        assert_ok!(store.rename_handle("alice", "alice").await);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_single_winner() {
        let store = Arc::new(MemoryCredentialStore::new());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.insert(Account::new("race", format!("h{i}"))).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(e, GatehouseError::Conflict(_))),
            }
        }

        assert_eq!(ok, 1);
        assert_eq!(store.len().await, 1);
        assert_err!(store.insert(Account::new("race", "late")).await);
    }
}
