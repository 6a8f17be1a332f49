//! Product API Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use shared::models::{Product, ProductCreate, ProductFilter};

use crate::api::{Json, Query};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;

/// GET /api/products?category=&search=&available_only=
pub async fn list(
    State(state): State<ServerState>,
    Query(filter): Query<ProductFilter>,
) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(state.catalog.query(&filter)?))
}

/// POST /api/products - seller is the caller
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<ProductCreate>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = state.catalog.create(&user.id, req)?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /api/products/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    Ok(Json(state.catalog.get(&id)?))
}

/// GET /api/products/seller/{seller_id}
pub async fn list_by_seller(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Path(seller_id): Path<String>,
) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(state.catalog.list_by_seller(&seller_id)?))
}
