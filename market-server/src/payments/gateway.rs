//! Payment gateway adapter
//!
//! [`PaymentGateway`] is the seam; [`StripeGateway`] talks to a
//! Stripe-compatible REST API through `reqwest` with a bounded timeout.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::PaymentConfig;

/// Amount and correlation data sent to the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    /// Minor currency units (cents)
    pub amount_minor: i64,
    pub currency: String,
    pub order_id: String,
    pub user_id: String,
}

/// Gateway answer to an intent request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub client_secret: String,
    pub intent_id: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Timeout, connection failure, 5xx or rate limiting; safe to retry
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),

    #[error("Payment gateway rejected the request: {0}")]
    Rejected(String),

    #[error("Unexpected payment gateway response: {0}")]
    InvalidResponse(String),

    #[error("Payment gateway is not configured")]
    NotConfigured,
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, GatewayError>;
}

pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: Option<String>,
    api_base: String,
}

#[derive(Deserialize)]
struct StripeIntent {
    id: String,
    client_secret: String,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(config: &PaymentConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, GatewayError> {
        let secret_key = self.secret_key.as_deref().ok_or(GatewayError::NotConfigured)?;
        let amount = request.amount_minor.to_string();

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .basic_auth(secret_key, None::<&str>)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", request.currency.as_str()),
                ("automatic_payment_methods[enabled]", "true"),
                ("metadata[orderId]", request.order_id.as_str()),
                ("metadata[userId]", request.user_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::Unavailable(format!("gateway returned {status}")));
        }
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| format!("gateway returned {status}"));
            return Err(GatewayError::Rejected(message));
        }

        let intent: StripeIntent = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            intent_id = %intent.id,
            order_id = %request.order_id,
            amount_minor = request.amount_minor,
            "Payment intent created"
        );
        Ok(PaymentIntent {
            client_secret: intent.client_secret,
            intent_id: intent.id,
        })
    }
}
