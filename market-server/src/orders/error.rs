use shared::error::{AppError, ErrorCode};
use shared::models::OrderStatus;
use shared::money::MoneyError;
use thiserror::Error;

use crate::store::StorageError;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order must contain at least one item")]
    Empty,

    #[error("Quantity must be at least 1 for product {0}")]
    InvalidQuantity(String),

    #[error("Product {0} appears more than once")]
    DuplicateItem(String),

    #[error("You cannot order your own listing: {0}")]
    OwnListing(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("All items in an order must come from one seller")]
    MultiSeller { sellers: Vec<String> },

    #[error("Products no longer available: {}", .0.join(", "))]
    ProductUnavailable(Vec<String>),

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("You are not part of this order")]
    NotParty,

    #[error("Only the seller can confirm an order")]
    SellerOnly,

    #[error("Transition to {0} is not permitted for this caller")]
    CauseNotPermitted(OrderStatus),

    #[error("Order {order_id} needs reconciliation; products not withdrawn: {}", .failed.join(", "))]
    PartialCreation { order_id: String, failed: Vec<String> },

    #[error("{0}")]
    Validation(String),

    #[error("Order total cannot be computed: {0}")]
    Amount(#[from] MoneyError),

    #[error("No reconciliation entry for order {0}")]
    ReconciliationNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl From<redb::CommitError> for OrderError {
    fn from(err: redb::CommitError) -> Self {
        Self::Storage(err.into())
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::Empty => AppError::with_message(ErrorCode::OrderEmpty, message),
            OrderError::InvalidQuantity(id) => {
                AppError::with_message(ErrorCode::OrderInvalidQuantity, message)
                    .with_detail("product_id", id)
            }
            OrderError::DuplicateItem(id) => {
                AppError::with_message(ErrorCode::OrderDuplicateItem, message)
                    .with_detail("product_id", id)
            }
            OrderError::OwnListing(id) => {
                AppError::with_message(ErrorCode::OrderOwnListing, message)
                    .with_detail("product_id", id)
            }
            OrderError::ProductNotFound(id) => {
                AppError::with_message(ErrorCode::ProductNotFound, message).with_detail("id", id)
            }
            OrderError::MultiSeller { sellers } => {
                AppError::with_message(ErrorCode::OrderMultiSeller, message)
                    .with_detail("sellers", sellers)
            }
            OrderError::ProductUnavailable(ids) => {
                AppError::with_message(ErrorCode::ProductUnavailable, message)
                    .with_detail("product_ids", ids)
            }
            OrderError::NotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, message).with_detail("id", id)
            }
            OrderError::InvalidTransition { from, to } => {
                AppError::with_message(ErrorCode::OrderInvalidTransition, message)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            OrderError::NotParty => AppError::with_message(ErrorCode::NotOrderParty, message),
            OrderError::SellerOnly | OrderError::CauseNotPermitted(_) => {
                AppError::with_message(ErrorCode::PermissionDenied, message)
            }
            OrderError::PartialCreation { order_id, failed } => {
                tracing::error!(order_id = %order_id, failed = ?failed, "Order needs reconciliation");
                AppError::with_message(ErrorCode::OrderPartiallyCreated, message)
                    .with_detail("order_id", order_id)
                    .with_detail("failed_products", failed)
            }
            OrderError::Validation(_) => AppError::validation(message),
            OrderError::Amount(_) => AppError::with_message(ErrorCode::AmountInvalid, message),
            OrderError::ReconciliationNotFound(id) => {
                AppError::with_message(ErrorCode::ReconciliationNotFound, message)
                    .with_detail("order_id", id)
            }
            OrderError::Storage(e) => e.into(),
        }
    }
}
