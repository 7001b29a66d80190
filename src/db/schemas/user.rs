//! User document schema
//!
//! Stores a username and its Argon2 password hash.

use bson::{doc, oid::ObjectId, DateTime, Document};
use chrono::Utc;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Name of the unique index on `username`
pub const USERNAME_INDEX: &str = "username_unique";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Unique username
    pub username: String,

    /// Argon2 password hash
    pub password_hash: String,
}

impl From<&Account> for UserDoc {
    fn from(account: &Account) -> Self {
        Self {
            _id: None,
            metadata: Metadata {
                created_at: Some(DateTime::from_chrono(account.created_at)),
                updated_at: Some(DateTime::from_chrono(account.updated_at)),
            },
            username: account.handle.clone(),
            password_hash: account.credential_hash.clone(),
        }
    }
}

impl From<UserDoc> for Account {
    fn from(doc: UserDoc) -> Self {
        let created_at = doc
            .metadata
            .created_at
            .map(|d| d.to_chrono())
            .unwrap_or_else(Utc::now);
        let updated_at = doc
            .metadata
            .updated_at
            .map(|d| d.to_chrono())
            .unwrap_or(created_at);

        Account {
            handle: doc.username,
            credential_hash: doc.password_hash,
            created_at,
            updated_at,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "username": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name(USERNAME_INDEX.to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_round_trip_keeps_timestamps() {
        let account = Account::new("alice", "$argon2id$v=19$abc");
        let doc = UserDoc::from(&account);
        assert_eq!(doc.username, "alice");
        assert_eq!(doc.password_hash, "$argon2id$v=19$abc");

        let back = Account::from(doc);
        assert_eq!(back.handle, "alice");
        // bson stores milliseconds
        assert_eq!(
            back.created_at.timestamp_millis(),
            account.created_at.timestamp_millis()
        );
    }

    #[test]
    fn test_missing_updated_at_falls_back_to_created() {
        let mut doc = UserDoc::from(&Account::new("bob", "h"));
        doc.metadata.updated_at = None;
        let account = Account::from(doc);
        assert_eq!(account.created_at, account.updated_at);
    }

    #[test]
    fn test_unique_username_index() {
        let indices = UserDoc::into_indices();
        assert_eq!(indices.len(), 1);
        let (keys, opts) = &indices[0];
        assert_eq!(keys, &doc! { "username": 1 });
        let opts = opts.as_ref().unwrap();
        assert_eq!(opts.unique, Some(true));
        assert_eq!(opts.name.as_deref(), Some(USERNAME_INDEX));
    }
}
