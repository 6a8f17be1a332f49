use super::{MarketStore, StorageResult, USERNAMES_TABLE, USERS_TABLE};
use redb::{ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};
use shared::models::User;

/// Stored account: public profile plus credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(flatten)]
    pub user: User,
    /// argon2 PHC string
    pub password_hash: String,
    /// Pending 6-digit code, cleared once verified
    pub verification_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset: Option<PasswordReset>,
}

/// Outstanding password reset code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordReset {
    pub code: String,
    /// Epoch millis
    pub expires_at: i64,
}

impl MarketStore {
    // ========== User Operations ==========

    pub fn get_user(&self, id: &str) -> StorageResult<Option<UserRecord>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_user_txn(
        &self,
        txn: &WriteTransaction,
        id: &str,
    ) -> StorageResult<Option<UserRecord>> {
        let table = txn.open_table(USERS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Insert or overwrite a user record and its username index entry
    pub fn put_user_txn(&self, txn: &WriteTransaction, record: &UserRecord) -> StorageResult<()> {
        let mut table = txn.open_table(USERS_TABLE)?;
        let value = serde_json::to_vec(record)?;
        table.insert(record.user.id.as_str(), value.as_slice())?;

        let mut names = txn.open_table(USERNAMES_TABLE)?;
        names.insert(record.user.username.as_str(), record.user.id.as_str())?;
        Ok(())
    }

    /// Identity owning a (lowercase) username
    pub fn find_username(&self, username: &str) -> StorageResult<Option<String>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERNAMES_TABLE)?;
        Ok(table.get(username)?.map(|g| g.value().to_string()))
    }

    pub fn username_taken_txn(&self, txn: &WriteTransaction, username: &str) -> StorageResult<bool> {
        let table = txn.open_table(USERNAMES_TABLE)?;
        Ok(table.get(username)?.is_some())
    }

    /// Display name for an identity, falling back to the identity itself
    pub fn display_name_txn(&self, txn: &WriteTransaction, id: &str) -> StorageResult<String> {
        Ok(self
            .get_user_txn(txn, id)?
            .map(|r| r.user.display_name().to_string())
            .unwrap_or_else(|| id.to_string()))
    }
}
