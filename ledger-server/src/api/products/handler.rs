//! Product API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};

use crate::api::operator;
use crate::audit::AuditAction;
use crate::core::ServerState;
use crate::utils::{AppError, AppResult};
use shared::models::{Product, ProductCreate, ProductUpdate};

/// GET /api/products - full catalog
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Product>>> {
    let products = state.products.find_all().await?;
    Ok(Json(products))
}

/// GET /api/products/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let product = state
        .products
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {}", id)))?;
    Ok(Json(product))
}

/// POST /api/products
pub async fn create(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(payload): Json<ProductCreate>,
) -> AppResult<Json<Product>> {
    let product = state.products.create(payload).await?;
    state.audit.record(
        AuditAction::ProductCreated,
        format!("product {} created", product.name),
        operator(&headers),
    );
    Ok(Json(product))
}

/// PUT /api/products/:id
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<ProductUpdate>,
) -> AppResult<Json<Product>> {
    let product = state.products.update(&id, payload).await?;
    state.audit.record(
        AuditAction::ProductUpdated,
        format!("product {} updated", id),
        operator(&headers),
    );
    Ok(Json(product))
}

/// DELETE /api/products/:id
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<serde_json::Value>> {
    let removed = state.products.delete(&id).await?;
    if !removed {
        return Err(AppError::NotFound(format!("Product {}", id)));
    }
    state.audit.record(
        AuditAction::ProductDeleted,
        format!("product {} deleted", id),
        operator(&headers),
    );
    Ok(Json(serde_json::json!({ "deleted": true })))
}
