//! HTTP route handlers

pub mod health;
pub mod users;

pub use health::{health_check, readiness_check, version_info};
pub use users::{handle_users_request, BoxBody};
