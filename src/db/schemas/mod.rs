//! Database schemas for Gatehouse
//!
//! Defines MongoDB document structures.

mod metadata;
mod user;

pub use metadata::Metadata;
pub use user::{UserDoc, USERNAME_INDEX, USER_COLLECTION};
