//! Payment API
//!
//! The webhook is public and authenticated by its signature header alone.

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/payment", payment_routes())
}

fn payment_routes() -> Router<ServerState> {
    Router::new()
        .route("/create-intent", post(handler::create_intent))
        .route("/webhook", post(handler::webhook))
}
