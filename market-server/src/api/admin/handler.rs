//! Operator API Handlers

use axum::{
    extract::{Path, State},
};
use serde::Serialize;
use shared::models::{Order, StatusUpdate, User};

use crate::api::Json;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::orders::TransitionCause;
use crate::store::{ReconciliationEntry, WebhookFailure};
use crate::utils::AppResult;

#[derive(Debug, Serialize)]
pub struct Resolved {
    pub order_id: String,
    pub resolved: bool,
}

/// GET /api/admin/reconciliation
pub async fn list_reconciliation(
    State(state): State<ServerState>,
) -> AppResult<Json<Vec<ReconciliationEntry>>> {
    Ok(Json(state.reconciler.list()?))
}

/// POST /api/admin/reconciliation/audit - returns newly flagged entries
pub async fn run_audit(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<ReconciliationEntry>>> {
    let flagged = state.reconciler.audit()?;
    tracing::info!(operator = %user.id, flagged = flagged.len(), "Availability audit run");
    Ok(Json(flagged))
}

/// POST /api/admin/reconciliation/{order_id}/resolve
pub async fn resolve_reconciliation(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<Resolved>> {
    state.reconciler.resolve(&order_id)?;
    tracing::info!(operator = %user.id, order_id = %order_id, "Reconciliation entry resolved");
    Ok(Json(Resolved {
        order_id,
        resolved: true,
    }))
}

/// POST /api/admin/orders/{id}/status
pub async fn set_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdate>,
) -> AppResult<Json<Order>> {
    let cause = TransitionCause::Operator {
        user_id: user.id.clone(),
    };
    Ok(Json(state.orders.advance_status(&id, req.status, &cause)?))
}

/// GET /api/admin/webhook-failures
pub async fn list_webhook_failures(
    State(state): State<ServerState>,
) -> AppResult<Json<Vec<WebhookFailure>>> {
    Ok(Json(state.store.list_webhook_failures()?))
}

/// POST /api/admin/users/{id}/recompute-rating
pub async fn recompute_rating(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    Ok(Json(state.reviews.recompute_rating(&id)?))
}
