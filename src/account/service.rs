//! Account service
//!
//! Orchestrates the credential store, password hashing and token signing
//! into the four account operations. Holds no mutable state of its own.
//!
//! Handles are trimmed before every lookup or write. Passwords are trimmed
//! at registration; login compares the password as supplied.

use std::sync::Arc;
use tracing::{info, warn};

use crate::account::{Account, AccountView};
use crate::auth::{
    hash_password_blocking, verify_password_blocking, Claims, JwtValidator, TokenInput,
};
use crate::store::CredentialStore;
use crate::types::{FieldError, GatehouseError, Result};

/// Minimum password length, in characters
pub const MIN_PASSWORD_LEN: usize = 6;

/// Returned for both unknown usernames and wrong passwords
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Returned when a username is already taken
pub const USERNAME_TAKEN: &str = "Username already exists";

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    tokens: JwtValidator,
}

fn validate_credentials(handle: &str, secret: &str) -> Result<()> {
    let mut errors = Vec::new();

    if handle.trim().is_empty() {
        errors.push(FieldError::new("username", "Username is required"));
    }

    let secret = secret.trim();
    if secret.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    } else if secret.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(GatehouseError::InvalidInput(errors))
    }
}

impl AccountService {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: JwtValidator) -> Self {
        Self { store, tokens }
    }

    /// Backing store, for health and readiness reporting
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Create an account.
    ///
    /// Input is validated before the store is touched. The lookup only
    /// saves a wasted hash; the store's insert is what guarantees a single
    /// account per handle.
    pub async fn register(&self, handle: &str, secret: &str) -> Result<()> {
        validate_credentials(handle, secret)?;
        let handle = handle.trim();

        if self.store.find_by_handle(handle).await?.is_some() {
            return Err(GatehouseError::Conflict(USERNAME_TAKEN.into()));
        }

        let credential_hash = hash_password_blocking(secret.trim().to_string()).await?;

        self.store
            .insert(Account::new(handle, credential_hash))
            .await?;

        info!("Registered new user: {}", handle);
        Ok(())
    }

    /// Check a username/password pair and issue a token.
    ///
    /// Unknown usernames and wrong passwords produce the same error.
    pub async fn authenticate(&self, handle: &str, secret: &str) -> Result<String> {
        let handle = handle.trim();

        let account = match self.store.find_by_handle(handle).await? {
            Some(account) => account,
            None => {
                warn!("Login failed - user not found: {}", handle);
                return Err(GatehouseError::Unauthorized(INVALID_CREDENTIALS.into()));
            }
        };

        let valid =
            verify_password_blocking(secret.to_string(), account.credential_hash.clone()).await?;
        if !valid {
            warn!("Login failed - invalid password: {}", handle);
            return Err(GatehouseError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let token = self.tokens.generate_token(TokenInput {
            username: account.handle.clone(),
        })?;

        info!("Login successful: {}", account.handle);
        Ok(token)
    }

    /// Public projection of every account
    pub async fn list_accounts(&self) -> Result<Vec<AccountView>> {
        let accounts = self.store.list_all().await?;
        Ok(accounts.iter().map(AccountView::from).collect())
    }

    /// Change an account's username.
    ///
    /// Fails with `Conflict` if another account holds `new_handle` and with
    /// `NotFound` if `old_handle` does not exist.
    pub async fn rename_handle(&self, old_handle: &str, new_handle: &str) -> Result<()> {
        let old_handle = old_handle.trim();
        let new_handle = new_handle.trim();

        if new_handle.is_empty() {
            return Err(GatehouseError::invalid(
                "newUsername",
                "New username is required",
            ));
        }

        if let Some(existing) = self.store.find_by_handle(new_handle).await? {
            if existing.handle != old_handle {
                return Err(GatehouseError::Conflict(USERNAME_TAKEN.into()));
            }
        }

        self.store.rename_handle(old_handle, new_handle).await?;

        info!("Renamed user {} -> {}", old_handle, new_handle);
        Ok(())
    }

    /// Verify a token previously issued by `authenticate`
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        self.tokens.verify_token(token).into_result()
    }
}
