//! Operator API
//!
//! | Path | Method |
//! |------|--------|
//! | /api/admin/reconciliation | GET |
//! | /api/admin/reconciliation/audit | POST |
//! | /api/admin/reconciliation/{order_id}/resolve | POST |
//! | /api/admin/orders/{id}/status | POST |
//! | /api/admin/webhook-failures | GET |
//! | /api/admin/users/{id}/recompute-rating | POST |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::require_operator;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/admin", admin_routes())
}

fn admin_routes() -> Router<ServerState> {
    Router::new()
        .route("/reconciliation", get(handler::list_reconciliation))
        .route("/reconciliation/audit", post(handler::run_audit))
        .route(
            "/reconciliation/{order_id}/resolve",
            post(handler::resolve_reconciliation),
        )
        .route("/orders/{id}/status", post(handler::set_status))
        .route("/webhook-failures", get(handler::list_webhook_failures))
        .route("/users/{id}/recompute-rating", post(handler::recompute_rating))
        .layer(middleware::from_fn(require_operator))
}
