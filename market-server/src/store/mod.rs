//! redb-based storage for the marketplace
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `users` | `email` | `UserRecord` | Accounts keyed by identity |
//! | `usernames` | `username` (lowercase) | `email` | Username uniqueness |
//! | `products` | `product_id` | `Product` | Catalog |
//! | `orders` | `order_id` | `Order` | Orders |
//! | `orders_by_party` | `(user_id, order_id)` | `()` | Buyer/seller lookup |
//! | `reviews` | `review_id` | `Review` | Append-only reviews |
//! | `reviews_by_user` | `(reviewed_id, created_at, review_id)` | `()` | Reviews received |
//! | `reviews_by_order` | `(order_id, review_id)` | `()` | Reviews per order |
//! | `review_keys` | `(order_id, reviewer_id, reviewed_id)` | `review_id` | One review per triple |
//! | `processed_events` | `event_id` | `ProcessedEvent` | Webhook dedupe ledger |
//! | `settled_intents` | `intent_id` | `order_id` | One settlement per intent |
//! | `reconciliation` | `order_id` | `ReconciliationEntry` | Operator queue |
//! | `webhook_failures` | `failure_id` | `WebhookFailure` | Post-verification failures |
//!
//! # Transactions
//!
//! redb serializes write transactions, so every check-then-write performed
//! inside one `WriteTransaction` is atomic with respect to other writers.
//! Engines compose the `_txn` helpers below and commit once.

mod ledger;
mod orders;
mod products;
mod reviews;
mod users;

pub use ledger::{
    ProcessedEvent, ReconciliationEntry, ReconciliationReason, SettlementOutcome, WebhookFailure,
};
pub use users::{PasswordReset, UserRecord};

use redb::{Database, TableDefinition, WriteTransaction};
use shared::error::{AppError, ErrorCode};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub(crate) const USERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
pub(crate) const USERNAMES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("usernames");
pub(crate) const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");
pub(crate) const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");
pub(crate) const ORDERS_BY_PARTY_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("orders_by_party");
pub(crate) const REVIEWS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("reviews");
pub(crate) const REVIEWS_BY_USER_TABLE: TableDefinition<(&str, i64, &str), ()> =
    TableDefinition::new("reviews_by_user");
pub(crate) const REVIEWS_BY_ORDER_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("reviews_by_order");
pub(crate) const REVIEW_KEYS_TABLE: TableDefinition<(&str, &str, &str), &str> =
    TableDefinition::new("review_keys");
pub(crate) const PROCESSED_EVENTS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("processed_events");
pub(crate) const SETTLED_INTENTS_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("settled_intents");
pub(crate) const RECONCILIATION_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("reconciliation");
pub(crate) const WEBHOOK_FAILURES_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("webhook_failures");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let code = match &err {
            StorageError::Storage(redb::StorageError::Corrupted(_)) => ErrorCode::StorageCorrupted,
            StorageError::Serialization(_) => ErrorCode::InternalError,
            _ => ErrorCode::DatabaseError,
        };
        AppError::with_message(code, err.to_string())
    }
}

/// Marketplace storage backed by redb
#[derive(Clone)]
pub struct MarketStore {
    db: Arc<Database>,
}

impl MarketStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS_TABLE)?;
            let _ = write_txn.open_table(USERNAMES_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_BY_PARTY_TABLE)?;
            let _ = write_txn.open_table(REVIEWS_TABLE)?;
            let _ = write_txn.open_table(REVIEWS_BY_USER_TABLE)?;
            let _ = write_txn.open_table(REVIEWS_BY_ORDER_TABLE)?;
            let _ = write_txn.open_table(REVIEW_KEYS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_EVENTS_TABLE)?;
            let _ = write_txn.open_table(SETTLED_INTENTS_TABLE)?;
            let _ = write_txn.open_table(RECONCILIATION_TABLE)?;
            let _ = write_txn.open_table(WEBHOOK_FAILURES_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> StorageResult<redb::ReadTransaction> {
        use redb::ReadableDatabase;
        Ok(self.db.begin_read()?)
    }
}
