//! Database layer for Gatehouse
//!
//! Provides MongoDB storage for user accounts.

pub mod mongo;
pub mod schemas;

pub use mongo::{MongoClient, MongoCollection};
pub use schemas::{Metadata, UserDoc};
