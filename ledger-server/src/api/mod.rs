//! API routing
//!
//! # Structure
//!
//! - [`health`] — health check
//! - [`products`] — catalog management
//! - [`orders`] — order lifecycle, installments and commission pin
//! - [`commission_payments`] — commission settlement batches
//!
//! Handlers stay thin: extract, call into the ledger, map errors through
//! [`AppError`](crate::utils::AppError). The acting operator is taken from
//! the `x-operator` header for the audit trail.

pub mod commission_payments;
pub mod health;
pub mod orders;
pub mod products;

use crate::core::ServerState;
use axum::Router;
use axum::http::HeaderMap;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// Re-export common types for handlers
pub use crate::utils::{AppError, AppResult};

pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(products::router())
        .merge(orders::router())
        .merge(commission_payments::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Acting operator for the audit trail, from the `x-operator` header.
pub fn operator(headers: &HeaderMap) -> &str {
    headers
        .get("x-operator")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("console")
}
