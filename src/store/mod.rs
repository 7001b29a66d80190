//! Credential store
//!
//! The only shared mutable state in the service. Backends must enforce
//! handle uniqueness inside `insert` and `rename_handle` themselves, as a
//! single atomic write, rather than trusting an earlier lookup.

mod memory;
mod mongo;

pub use memory::MemoryCredentialStore;
pub use mongo::MongoCredentialStore;

use crate::account::Account;
use crate::types::Result;

/// Persistence for account records
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a new account. Fails with `Conflict` if the handle exists.
    async fn insert(&self, account: Account) -> Result<Account>;

    /// Look up an account by handle. Absence is `Ok(None)`.
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Account>>;

    /// Change an account's handle and refresh `updated_at`.
    ///
    /// Fails with `Conflict` if `new_handle` belongs to another account and
    /// with `NotFound` if `old_handle` does not exist.
    async fn rename_handle(&self, old_handle: &str, new_handle: &str) -> Result<()>;

    /// All accounts, in backend order
    async fn list_all(&self) -> Result<Vec<Account>>;

    /// Check the backend is reachable
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    /// Short backend name for health output
    fn backend(&self) -> &'static str;
}
