//! Authentication middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::Method;
use shared::error::ErrorCode;

use crate::AppError;
use crate::auth::extractor::jwt_rejection;
use crate::auth::{CurrentUser, JwtService};
use crate::core::ServerState;
use crate::security_log;

/// Routes reachable without a bearer token
///
/// | Method | Path |
/// |--------|------|
/// | POST | /api/auth/register, /api/auth/login, /api/auth/verify-email |
/// | GET | /api/products, /api/products/{id} |
/// | GET | /api/reviews/user/{id} |
/// | POST | /api/payment/webhook (signature-authenticated) |
pub fn is_public_route(method: &Method, path: &str) -> bool {
    let path = path.trim_end_matches('/');
    if *method == Method::POST {
        return matches!(
            path,
            "/api/auth/register"
                | "/api/auth/login"
                | "/api/auth/verify-email"
                | "/api/auth/forgot-password"
                | "/api/auth/reset-password"
                | "/api/payment/webhook"
        );
    }
    if *method == Method::GET {
        if path == "/api/products" {
            return true;
        }
        if let Some(rest) = path.strip_prefix("/api/products/") {
            return !rest.is_empty() && !rest.contains('/');
        }
        if let Some(rest) = path.strip_prefix("/api/reviews/user/") {
            return !rest.is_empty() && !rest.contains('/');
        }
    }
    false
}

/// Require a valid bearer token on every non-public `/api/` route.
///
/// On success the [`CurrentUser`] is inserted into request extensions.
///
/// # Skipped
///
/// - `OPTIONS *` (CORS preflight)
/// - non-`/api/` paths
/// - [`is_public_route`]
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let path = req.uri().path();
    if !path.starts_with("/api/") || is_public_route(req.method(), path) {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => {
            security_log!("WARN", "auth_missing", uri = format!("{:?}", req.uri()));
            return Err(AppError::unauthorized());
        }
    };

    match state.get_jwt_service().validate_token(token) {
        Ok(claims) => {
            let is_operator = state.is_operator(&claims.sub);
            req.extensions_mut()
                .insert(CurrentUser::from(claims).with_operator(is_operator));
            Ok(next.run(req).await)
        }
        Err(e) => {
            security_log!(
                "WARN",
                "auth_failed",
                error = format!("{}", e),
                uri = format!("{:?}", req.uri())
            );
            Err(jwt_rejection(e))
        }
    }
}

/// Require the caller to be a configured operator.
///
/// Must run after [`require_auth`].
pub async fn require_operator(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::unauthorized())?;

    if !user.is_operator {
        security_log!(
            "WARN",
            "operator_required",
            user_id = user.id.clone(),
            uri = format!("{:?}", req.uri())
        );
        return Err(AppError::new(ErrorCode::OperatorRequired));
    }

    Ok(next.run(req).await)
}
