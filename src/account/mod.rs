//! Accounts: the stored record, its public view, and the service that
//! registers, authenticates, lists and renames them.

mod model;
mod service;

pub use model::{Account, AccountView};
pub use service::{AccountService, INVALID_CREDENTIALS, MIN_PASSWORD_LEN, USERNAME_TAKEN};
