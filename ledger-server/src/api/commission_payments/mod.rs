//! Commission payment API module

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/commission-payments", commission_routes())
}

fn commission_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::pay))
        .route("/due", get(handler::commission_due))
        .route("/{id}", axum::routing::delete(handler::reverse))
}
