//! Credential verification

use async_trait::async_trait;

use super::UserError;
use crate::auth::password::verify_password;
use crate::store::MarketStore;

/// Authenticated identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Account key (lowercased email)
    pub identity: String,
    pub username: String,
    pub verified: bool,
}

/// Resolves a username and password to an identity
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Err(InvalidCredentials)` for an unknown user or a wrong password alike.
    async fn authenticate(&self, username: &str, password: &str) -> Result<Identity, UserError>;
}

/// Identity provider backed by the `users` table
#[derive(Clone)]
pub struct StoreIdentityProvider {
    store: MarketStore,
}

impl StoreIdentityProvider {
    pub fn new(store: MarketStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IdentityProvider for StoreIdentityProvider {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Identity, UserError> {
        let username = username.trim().to_lowercase();
        let Some(id) = self.store.find_username(&username)? else {
            return Err(UserError::InvalidCredentials);
        };
        let Some(record) = self.store.get_user(&id)? else {
            return Err(UserError::InvalidCredentials);
        };

        let password = password.to_string();
        let hash = record.password_hash.clone();
        let matched = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| UserError::Internal(e.to_string()))?;

        match matched {
            Ok(true) => Ok(Identity {
                identity: record.user.id,
                username: record.user.username,
                verified: record.user.is_email_verified,
            }),
            Ok(false) => Err(UserError::InvalidCredentials),
            Err(e) => {
                tracing::error!(user = %id, error = %e, "Stored password hash is malformed");
                Err(UserError::InvalidCredentials)
            }
        }
    }
}
