//! Review API

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/reviews", review_routes())
}

fn review_routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::submit))
        .route(
            "/can-review/{order_id}/{reviewed_user_id}",
            get(handler::can_review),
        )
        .route("/user/{user_id}", get(handler::list_for_user))
        .route("/order/{order_id}", get(handler::list_for_order))
}
