//! Order API
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/orders | POST | user (buyer) |
//! | /api/orders/user/{user_id} | GET | self or operator |
//! | /api/orders/{id} | GET | party or operator |
//! | /api/orders/{id}/confirm | POST | seller |
//! | /api/orders/{id}/meetup | POST | party |
//! | /api/orders/{id}/cancel | POST | party |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", order_routes())
}

fn order_routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/user/{user_id}", get(handler::list_for_user))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/confirm", post(handler::confirm))
        .route("/{id}/meetup", post(handler::schedule_meetup))
        .route("/{id}/cancel", post(handler::cancel))
}
