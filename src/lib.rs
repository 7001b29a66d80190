//! Gatehouse - user account service
//!
//! Registration, login, listing and username changes for a single user
//! collection, with credentials hashed by Argon2 and sessions carried in
//! HS256 JWTs.
//!
//! ## Services
//!
//! - **Accounts**: register, authenticate, list and rename (`/users/*`)
//! - **Store**: MongoDB-backed credential store with an in-memory fallback
//! - **Tokens**: one-hour identity tokens plus verification for callers

pub mod account;
pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;

pub use account::{Account, AccountService, AccountView};
pub use config::Args;
pub use server::{run, serve, AppState};
pub use types::{GatehouseError, Result};
