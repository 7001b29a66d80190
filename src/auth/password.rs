//! Password hashing and verification using Argon2
//!
//! Uses the argon2id variant with fixed parameters so every stored hash
//! costs the same to check. Output is a PHC string carrying its own salt.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::types::GatehouseError;

/// Memory cost in KiB
const MEMORY_COST_KIB: u32 = 19 * 1024;
/// Iteration count
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;

fn hasher() -> Result<Argon2<'static>, GatehouseError> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)
        .map_err(|e| GatehouseError::Hashing(format!("Invalid Argon2 parameters: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password using Argon2id
///
/// Returns the PHC-formatted hash string that includes the salt and parameters.
pub fn hash_password(password: &str) -> Result<String, GatehouseError> {
    let salt = SaltString::generate(&mut OsRng);

    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| GatehouseError::Hashing(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash
///
/// Returns true if the password matches the hash. A malformed stored hash is
/// an error, not a mismatch. The digest comparison is constant time.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, GatehouseError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| GatehouseError::Hashing(format!("Invalid password hash format: {e}")))?;

    match hasher()?.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(GatehouseError::Hashing(format!(
            "Password verification failed: {e}"
        ))),
    }
}

/// Hash on the blocking pool
pub async fn hash_password_blocking(password: String) -> Result<String, GatehouseError> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

/// Verify on the blocking pool
pub async fn verify_password_blocking(
    password: String,
    hash: String,
) -> Result<bool, GatehouseError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?
}
