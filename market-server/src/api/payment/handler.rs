//! Payment API Handlers

use axum::{body::Bytes, extract::State, http::HeaderMap};
use serde::Deserialize;

use crate::api::Json;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::payments::{PaymentIntent, WebhookAck};
use crate::security_log;
use crate::utils::AppResult;

const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub order_id: String,
}

/// POST /api/payment/create-intent - amount comes from the stored order
pub async fn create_intent(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<CreateIntentRequest>,
) -> AppResult<Json<PaymentIntent>> {
    Ok(Json(state.payments.create_intent(&req.order_id, &user.id).await?))
}

/// POST /api/payment/webhook - raw body, verified before parsing
pub async fn webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let processor = state.webhooks.clone();
    let payload = body.to_vec();
    let header = signature.map(str::to_string);
    let result = tokio::task::spawn_blocking(move || {
        processor.handle_settlement_event(&payload, header.as_deref())
    })
    .await
    .map_err(|e| crate::utils::AppError::internal(e.to_string()))?;

    match result {
        Ok(ack) => Ok(Json(ack)),
        Err(e) => {
            security_log!("WARN", "webhook_rejected", error = e.to_string());
            Err(e.into())
        }
    }
}
