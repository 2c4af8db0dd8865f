//! Commission Payment API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::Deserialize;

use crate::api::operator;
use crate::core::ServerState;
use crate::utils::AppResult;
use shared::models::{CommissionPayment, Order};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerQuery {
    pub seller: Option<String>,
}

/// GET /api/commission-payments
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<SellerQuery>,
) -> AppResult<Json<Vec<CommissionPayment>>> {
    let payments = match query.seller {
        Some(seller) => state.commission_payments.find_by_seller(&seller).await?,
        None => state.commission_payments.find_all().await?,
    };
    Ok(Json(payments))
}

/// GET /api/commission-payments/due - delivered orders still owing commission
pub async fn commission_due(
    State(state): State<ServerState>,
    Query(query): Query<SellerQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let orders = state.payroll.commission_due(query.seller.as_deref()).await?;
    Ok(Json(orders))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPayload {
    pub seller_id: String,
    pub amount: f64,
    pub order_ids: Vec<String>,
    /// Settlement period label, e.g. "2026-08"
    pub period: String,
}

/// POST /api/commission-payments
pub async fn pay(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(payload): Json<PayPayload>,
) -> AppResult<Json<CommissionPayment>> {
    let payment = state
        .payroll
        .pay(
            &payload.seller_id,
            payload.amount,
            payload.order_ids,
            payload.period,
            operator(&headers),
        )
        .await?;
    Ok(Json(payment))
}

/// DELETE /api/commission-payments/:id
pub async fn reverse(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<serde_json::Value>> {
    state.payroll.reverse(&id, operator(&headers)).await?;
    Ok(Json(serde_json::json!({ "reversed": true })))
}
