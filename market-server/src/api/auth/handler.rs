//! Auth API Handlers

use axum::{extract::State, http::StatusCode};
use serde_json::{Value, json};
use shared::models::{
    ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest, LoginResponse, RegisterRequest,
    ResetPasswordRequest, User, VerifyEmailRequest,
};

use crate::api::Json;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;

/// POST /api/auth/register
pub async fn register(
    State(state): State<ServerState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.users.register(&req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    Ok(Json(state.users.login(&req).await?))
}

/// POST /api/auth/verify-email
pub async fn verify_email(
    State(state): State<ServerState>,
    Json(req): Json<VerifyEmailRequest>,
) -> AppResult<Json<User>> {
    Ok(Json(state.users.verify_email(&req)?))
}

/// POST /api/auth/forgot-password
pub async fn forgot_password(
    State(state): State<ServerState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ForgotPasswordResponse>> {
    Ok(Json(state.users.request_password_reset(&req).await?))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<ServerState>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<Value>> {
    state.users.reset_password(&req).await?;
    Ok(Json(json!({ "message": "Password successfully reset" })))
}

/// GET /api/auth/me
pub async fn me(State(state): State<ServerState>, user: CurrentUser) -> AppResult<Json<User>> {
    Ok(Json(state.users.profile(&user.id)?))
}
