//! Shared types for Gatehouse

pub mod error;

pub use error::{FieldError, GatehouseError, Result, INTERNAL_MESSAGE};
