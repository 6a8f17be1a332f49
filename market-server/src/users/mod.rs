//! Accounts and credentials

mod identity;
mod service;

pub use identity::{Identity, IdentityProvider, StoreIdentityProvider};
pub use service::{UserError, UserService, is_valid_username};
