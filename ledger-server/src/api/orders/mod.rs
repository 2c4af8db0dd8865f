//! Order API module

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", order_routes())
}

fn order_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id).delete(handler::permanently_delete))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}/soft-delete", post(handler::soft_delete))
        .route("/{id}/restore", post(handler::restore))
        .route("/{id}/seller", put(handler::reassign_seller))
        .route(
            "/{id}/commission",
            put(handler::set_manual_commission).delete(handler::clear_manual_commission),
        )
        .route("/{id}/installment-plan", put(handler::update_installment_plan))
        .route(
            "/{id}/installments/{number}/payments",
            post(handler::record_payment),
        )
        .route(
            "/{id}/installments/{number}/payments/{payment_id}",
            axum::routing::delete(handler::reverse_payment),
        )
        .route(
            "/{id}/installments/{number}/due-date",
            put(handler::update_due_date),
        )
}
