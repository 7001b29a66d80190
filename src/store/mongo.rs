//! MongoDB credential store
//!
//! Uniqueness rides on the `username_unique` index: inserts and renames are
//! single writes, and a duplicate-key failure becomes `Conflict`.

use bson::doc;
use tracing::debug;

use super::CredentialStore;
use crate::account::Account;
use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{GatehouseError, Result};

#[derive(Debug, Clone)]
pub struct MongoCredentialStore {
    client: MongoClient,
    users: MongoCollection<UserDoc>,
}

fn username_conflict(err: GatehouseError) -> GatehouseError {
    match err {
        GatehouseError::Conflict(_) => GatehouseError::Conflict("Username already exists".into()),
        other => other,
    }
}

impl MongoCredentialStore {
    /// Open the users collection, creating its indexes
    pub async fn new(client: MongoClient) -> Result<Self> {
        let users = client.collection::<UserDoc>(USER_COLLECTION).await?;
        Ok(Self { client, users })
    }
}

#[async_trait::async_trait]
impl CredentialStore for MongoCredentialStore {
    async fn insert(&self, account: Account) -> Result<Account> {
        self.users
            .insert_one(UserDoc::from(&account))
            .await
            .map_err(username_conflict)?;

        debug!("mongo store: insert {}", account.handle);
        Ok(account)
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Account>> {
        Ok(self
            .users
            .find_one(doc! { "username": handle })
            .await?
            .map(Account::from))
    }

    async fn rename_handle(&self, old_handle: &str, new_handle: &str) -> Result<()> {
        let result = self
            .users
            .update_one(
                doc! { "username": old_handle },
                doc! { "username": new_handle },
            )
            .await
            .map_err(username_conflict)?;

        if result.matched_count == 0 {
            return Err(GatehouseError::NotFound("User not found".into()));
        }

        debug!("mongo store: rename {} -> {}", old_handle, new_handle);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Account>> {
        Ok(self
            .users
            .find_many(doc! {})
            .await?
            .into_iter()
            .map(Account::from)
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        self.client.ping().await
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}
