//! Account record and its public projection

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// A stored account
///
/// `credential_hash` is the Argon2 PHC string. It is never serialized;
/// anything leaving the service goes through [`AccountView`].
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub handle: String,
    pub credential_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account stamped with the current time
    pub fn new(handle: impl Into<String>, credential_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            handle: handle.into(),
            credential_hash: credential_hash.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("handle", &self.handle)
            .field("credential_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Account as returned by `GET /users`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            username: account.handle.clone(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}
