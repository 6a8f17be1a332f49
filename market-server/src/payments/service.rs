use std::sync::Arc;

use shared::error::{AppError, ErrorCode};
use shared::models::OrderStatus;
use shared::money::{self, MoneyError};
use thiserror::Error;

use super::gateway::{GatewayError, IntentRequest, PaymentGateway, PaymentIntent};
use crate::store::{MarketStore, StorageError};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Only the buyer can pay for an order")]
    NotBuyer,

    #[error("Order is {0}, payment requires pending")]
    NotPending(OrderStatus),

    #[error("Invalid order amount: {0}")]
    Amount(#[from] MoneyError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        let message = err.to_string();
        match err {
            PaymentError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, message).with_detail("id", id)
            }
            PaymentError::NotBuyer => AppError::permission_denied(message),
            PaymentError::NotPending(status) => {
                AppError::with_message(ErrorCode::OrderNotPending, message)
                    .with_detail("status", status.as_str())
            }
            PaymentError::Amount(_) => AppError::with_message(ErrorCode::AmountInvalid, message),
            PaymentError::Gateway(e) => {
                let code = match e {
                    GatewayError::Unavailable(_) => ErrorCode::GatewayUnavailable,
                    GatewayError::Rejected(_) | GatewayError::InvalidResponse(_) => {
                        ErrorCode::GatewayRejected
                    }
                    GatewayError::NotConfigured => ErrorCode::GatewayNotConfigured,
                };
                AppError::with_message(code, message)
            }
            PaymentError::Storage(e) => e.into(),
        }
    }
}

/// Creates payment intents for pending orders
///
/// Local state is never written here; the intent id reaches the order only
/// through a verified settlement event.
#[derive(Clone)]
pub struct PaymentService {
    store: MarketStore,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl PaymentService {
    pub fn new(store: MarketStore, gateway: Arc<dyn PaymentGateway>, currency: String) -> Self {
        Self {
            store,
            gateway,
            currency,
        }
    }

    pub async fn create_intent(
        &self,
        order_id: &str,
        caller_id: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        let order = self
            .store
            .get_order(order_id)?
            .ok_or_else(|| PaymentError::OrderNotFound(order_id.to_string()))?;
        if order.buyer_id != caller_id {
            return Err(PaymentError::NotBuyer);
        }
        if order.status != OrderStatus::Pending {
            return Err(PaymentError::NotPending(order.status));
        }

        let request = IntentRequest {
            amount_minor: money::to_minor_units(order.total_amount)?,
            currency: self.currency.clone(),
            order_id: order.id.clone(),
            user_id: order.buyer_id.clone(),
        };

        match self.gateway.create_intent(&request).await {
            Ok(intent) => Ok(intent),
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(order_id, error = %e, "Payment gateway unavailable");
                } else {
                    tracing::error!(order_id, error = %e, "Payment intent failed");
                }
                Err(e.into())
            }
        }
    }
}
