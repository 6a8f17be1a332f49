//! Order API Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use shared::models::{MeetupRequest, Order, OrderCreate};

use crate::api::Json;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// POST /api/orders - the caller is the buyer
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<OrderCreate>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let order = state.orders.create_order(&user.id, &req.items)?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders/user/{user_id} - newest first
pub async fn list_for_user(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Order>>> {
    if user.id != user_id && !user.is_operator {
        return Err(AppError::permission_denied("You can only view your own orders"));
    }
    Ok(Json(state.orders.list_orders(&user_id)?))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.get_order_for(&id, &user.id, user.is_operator)?))
}

/// POST /api/orders/{id}/confirm
pub async fn confirm(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.confirm(&id, &user.id)?))
}

/// POST /api/orders/{id}/meetup
pub async fn schedule_meetup(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<MeetupRequest>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.schedule_meetup(&id, &user.id, &req)?))
}

/// POST /api/orders/{id}/cancel - releases the listed products
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.cancel(&id, &user.id)?))
}
