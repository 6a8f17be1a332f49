//! Review API Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use shared::models::{Review, ReviewCreate, ReviewEligibility};

use crate::api::Json;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;

/// GET /api/reviews/can-review/{order_id}/{reviewed_user_id}
///
/// Always 200; ineligibility is reported in the body.
pub async fn can_review(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path((order_id, reviewed_user_id)): Path<(String, String)>,
) -> AppResult<Json<ReviewEligibility>> {
    Ok(Json(state.reviews.check_eligibility(
        &order_id,
        &user.id,
        &reviewed_user_id,
    )?))
}

/// POST /api/reviews
pub async fn submit(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<ReviewCreate>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let review = state.reviews.submit_review(&user.id, &req)?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /api/reviews/user/{user_id} - public
pub async fn list_for_user(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Review>>> {
    Ok(Json(state.reviews.list_for_user(&user_id)?))
}

/// GET /api/reviews/order/{order_id}
pub async fn list_for_order(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<Vec<Review>>> {
    Ok(Json(state.reviews.list_for_order(
        &order_id,
        &user.id,
        user.is_operator,
    )?))
}
