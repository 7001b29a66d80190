//! Authentication for Gatehouse
//!
//! Provides:
//! - Password hashing with Argon2
//! - JWT token generation and validation

pub mod jwt;
pub mod password;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult};
pub use password::{
    hash_password, hash_password_blocking, verify_password, verify_password_blocking,
};
