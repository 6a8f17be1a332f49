//! Settlement webhook processing
//!
//! ```text
//! verify signature ──✗──> reject (no state change)
//!        │
//!        ▼
//! parse + dedupe on event id ──seen──> ack
//!        │
//!        ▼
//! one write txn: outcome + ledger entry ──err──> record failure, ack
//! ```
//!
//! Replays are absorbed twice over: by event id in `processed_events` and by
//! intent id in `settled_intents`.

use std::collections::HashMap;

use redb::WriteTransaction;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::OrderStatus;
use shared::util::{new_id, now_millis};
use thiserror::Error;

use super::signature::{SignatureError, verify_webhook_signature};
use crate::orders::{OrderEngine, OrderError, TransitionCause};
use crate::store::{
    MarketStore, ProcessedEvent, ReconciliationEntry, ReconciliationReason, SettlementOutcome,
    StorageError, WebhookFailure,
};

pub const EVENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const EVENT_FAILED: &str = "payment_intent.payment_failed";

/// Metadata key carrying the order reference
const META_ORDER_ID: &str = "orderId";

/// Errors returned to the gateway; nothing was written
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook secret is not configured")]
    NotConfigured,

    #[error("Missing signature header")]
    MissingSignature,

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        let code = match err {
            WebhookError::NotConfigured => ErrorCode::GatewayNotConfigured,
            WebhookError::MissingSignature | WebhookError::Signature(_) => {
                ErrorCode::WebhookSignatureInvalid
            }
        };
        AppError::with_message(code, err.to_string())
    }
}

/// Failures after verification; recorded, never surfaced to the gateway
#[derive(Debug, Error)]
enum ProcessingError {
    #[error("Malformed event: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Succeeded event without intent id")]
    MissingIntent,

    #[error("Order referenced by event not found: {0}")]
    OrderMissing(String),

    #[error("Intent {intent_id} already settled order {settled}")]
    IntentReused { intent_id: String, settled: String },

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<redb::CommitError> for ProcessingError {
    fn from(err: redb::CommitError) -> Self {
        Self::Storage(err.into())
    }
}

#[derive(Debug, Deserialize)]
struct GatewayEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: EventData,
}

#[derive(Debug, Default, Deserialize)]
struct EventData {
    #[serde(default)]
    object: EventObject,
}

#[derive(Debug, Default, Deserialize)]
struct EventObject {
    id: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    last_payment_error: Option<LastPaymentError>,
}

#[derive(Debug, Deserialize)]
struct LastPaymentError {
    message: Option<String>,
}

/// Acknowledgement body; the gateway sees `{"received": true}`
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip)]
    pub outcome: Option<SettlementOutcome>,
    #[serde(skip)]
    pub duplicate: bool,
}

impl WebhookAck {
    fn new(outcome: Option<SettlementOutcome>, duplicate: bool) -> Self {
        Self {
            received: true,
            outcome,
            duplicate,
        }
    }
}

#[derive(Clone)]
pub struct WebhookProcessor {
    store: MarketStore,
    orders: OrderEngine,
    secret: Option<String>,
    tolerance_secs: i64,
}

impl WebhookProcessor {
    pub fn new(
        store: MarketStore,
        orders: OrderEngine,
        secret: Option<String>,
        tolerance_secs: i64,
    ) -> Self {
        Self {
            store,
            orders,
            secret,
            tolerance_secs,
        }
    }

    /// Verify, then apply a settlement event exactly once.
    ///
    /// Returns `Err` only when the event is not authentic. Every verified
    /// event is acknowledged, including ones that fail to process.
    pub fn handle_settlement_event(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookAck, WebhookError> {
        let secret = self.secret.as_deref().ok_or_else(|| {
            tracing::warn!("Webhook rejected: secret not configured");
            WebhookError::NotConfigured
        })?;
        let signature = signature.ok_or_else(|| {
            tracing::warn!("Webhook rejected: missing signature header");
            WebhookError::MissingSignature
        })?;
        if let Err(e) = verify_webhook_signature(payload, signature, secret, self.tolerance_secs) {
            tracing::warn!(error = %e, "Webhook signature verification failed");
            return Err(e.into());
        }

        let event: GatewayEvent = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(e) => {
                self.record_failure(None, None, &ProcessingError::from(e));
                return Ok(WebhookAck::new(None, false));
            }
        };

        match self.process(&event) {
            Ok(ack) => Ok(ack),
            Err(e) => {
                self.record_failure(Some(&event.id), Some(&event.event_type), &e);
                Ok(WebhookAck::new(None, false))
            }
        }
    }

    fn process(&self, event: &GatewayEvent) -> Result<WebhookAck, ProcessingError> {
        let txn = self.store.begin_write()?;

        if let Some(previous) = self.store.get_processed_event_txn(&txn, &event.id)? {
            tracing::info!(event_id = %event.id, outcome = ?previous.outcome, "Duplicate webhook event, skipping");
            return Ok(WebhookAck::new(Some(previous.outcome), true));
        }

        let object = &event.data.object;
        let order_ref = object
            .metadata
            .get(META_ORDER_ID)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty());

        let (outcome, detail) = match event.event_type.as_str() {
            EVENT_SUCCEEDED => match order_ref {
                Some(order_id) => {
                    let intent_id = object.id.as_deref().ok_or(ProcessingError::MissingIntent)?;
                    (self.settle_txn(&txn, order_id, intent_id)?, None)
                }
                None => {
                    tracing::warn!(event_id = %event.id, "Settlement event without order reference");
                    (SettlementOutcome::Untraceable, None)
                }
            },
            EVENT_FAILED => {
                let reason = object
                    .last_payment_error
                    .as_ref()
                    .and_then(|e| e.message.clone());
                tracing::warn!(
                    event_id = %event.id,
                    order_id = ?order_ref,
                    reason = ?reason,
                    "Payment failed"
                );
                (SettlementOutcome::PaymentFailed, reason)
            }
            other => {
                tracing::debug!(event_type = other, "Unhandled webhook event type");
                (SettlementOutcome::Ignored, None)
            }
        };

        self.store.record_processed_event_txn(
            &txn,
            &ProcessedEvent {
                event_id: event.id.clone(),
                event_type: event.event_type.clone(),
                intent_id: object.id.clone(),
                order_id: order_ref.map(str::to_string),
                outcome,
                detail,
                processed_at: now_millis(),
            },
        )?;
        txn.commit()?;

        tracing::info!(event_id = %event.id, event_type = %event.event_type, outcome = ?outcome, "Webhook processed");
        Ok(WebhookAck::new(Some(outcome), false))
    }

    fn settle_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        intent_id: &str,
    ) -> Result<SettlementOutcome, ProcessingError> {
        if let Some(settled) = self.store.settled_intent_txn(txn, intent_id)? {
            if settled == order_id {
                return Ok(SettlementOutcome::AlreadyCompleted);
            }
            return Err(ProcessingError::IntentReused {
                intent_id: intent_id.to_string(),
                settled,
            });
        }

        let order = self
            .store
            .get_order_txn(txn, order_id)?
            .ok_or_else(|| ProcessingError::OrderMissing(order_id.to_string()))?;

        let outcome = match order.status {
            OrderStatus::Completed => SettlementOutcome::AlreadyCompleted,
            OrderStatus::Cancelled => {
                self.store.upsert_reconciliation_txn(
                    txn,
                    ReconciliationEntry {
                        order_id: order.id.clone(),
                        product_ids: order.product_ids().map(str::to_string).collect(),
                        reason: ReconciliationReason::PaymentForCancelledOrder,
                        detail: Some(format!("intent {intent_id} settled after cancellation")),
                        detected_at: now_millis(),
                        retry_count: 0,
                        last_error: None,
                    },
                )?;
                tracing::warn!(order_id, intent_id, "Payment settled for cancelled order");
                SettlementOutcome::RejectedCancelled
            }
            _ => {
                let cause = TransitionCause::PaymentSettled {
                    intent_id: intent_id.to_string(),
                };
                self.orders
                    .advance_status_txn(txn, order_id, OrderStatus::Completed, &cause)?;
                SettlementOutcome::Applied
            }
        };

        self.store.record_settled_intent_txn(txn, intent_id, order_id)?;
        Ok(outcome)
    }

    fn record_failure(
        &self,
        event_id: Option<&str>,
        event_type: Option<&str>,
        error: &ProcessingError,
    ) {
        tracing::error!(event_id = ?event_id, event_type = ?event_type, error = %error, "Webhook processing failed");
        let failure = WebhookFailure {
            id: new_id(),
            event_id: event_id.map(str::to_string),
            event_type: event_type.map(str::to_string),
            error: error.to_string(),
            received_at: now_millis(),
        };
        if let Err(e) = self.store.record_webhook_failure(&failure) {
            tracing::error!(error = %e, "Failed to record webhook failure");
        }
    }
}
