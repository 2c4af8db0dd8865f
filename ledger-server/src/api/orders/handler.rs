//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::operator;
use crate::core::ServerState;
use crate::utils::{AppError, AppResult};
use shared::models::{Order, OrderDraft, OrderStatus, Payment, PaymentInput};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<OrderStatus>,
    pub seller: Option<String>,
    /// Include soft-deleted orders (trash view)
    #[serde(default)]
    pub include_deleted: bool,
}

/// GET /api/orders - list orders, newest first
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let mut orders = match (&query.status, &query.seller) {
        (Some(status), _) => state.orders.find_by_status(*status).await?,
        (None, Some(seller)) => state.orders.find_by_seller(seller).await?,
        (None, None) if query.include_deleted => state.orders.find_everything().await?,
        (None, None) => state.orders.find_all().await?,
    };
    if let Some(seller) = &query.seller {
        orders.retain(|o| o.seller_id.as_deref() == Some(seller.as_str()));
    }
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(orders))
}

/// GET /api/orders/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state
        .orders
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {}", id)))?;
    Ok(Json(order))
}

/// POST /api/orders
pub async fn create(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(draft): Json<OrderDraft>,
) -> AppResult<Json<Order>> {
    let order = state.ledger.create(draft, operator(&headers)).await?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct StatusPayload {
    pub status: OrderStatus,
}

/// PUT /api/orders/:id/status
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<StatusPayload>,
) -> AppResult<Json<Order>> {
    let order = state
        .ledger
        .transition(&id, payload.status, operator(&headers))
        .await?;
    Ok(Json(order))
}

/// POST /api/orders/:id/soft-delete
pub async fn soft_delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<Order>> {
    let order = state.ledger.soft_delete(&id, operator(&headers)).await?;
    Ok(Json(order))
}

/// POST /api/orders/:id/restore
pub async fn restore(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<Order>> {
    let order = state.ledger.restore(&id, operator(&headers)).await?;
    Ok(Json(order))
}

/// DELETE /api/orders/:id - permanent removal, only from the trash
pub async fn permanently_delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<serde_json::Value>> {
    state
        .ledger
        .permanently_delete(&id, operator(&headers))
        .await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerPayload {
    pub seller_id: Option<String>,
    pub seller_name: Option<String>,
}

/// PUT /api/orders/:id/seller
pub async fn reassign_seller(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<SellerPayload>,
) -> AppResult<Json<Order>> {
    let order = state
        .ledger
        .reassign_seller(
            &id,
            payload.seller_id,
            payload.seller_name,
            operator(&headers),
        )
        .await?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct CommissionPayload {
    pub amount: f64,
}

/// PUT /api/orders/:id/commission - pin a manual commission
pub async fn set_manual_commission(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<CommissionPayload>,
) -> AppResult<Json<Order>> {
    let order = state
        .ledger
        .set_manual_commission(&id, payload.amount, operator(&headers))
        .await?;
    Ok(Json(order))
}

/// DELETE /api/orders/:id/commission - back to automatic
pub async fn clear_manual_commission(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<Order>> {
    let order = state
        .ledger
        .clear_manual_commission(&id, operator(&headers))
        .await?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct PlanPayload {
    pub count: u32,
}

/// PUT /api/orders/:id/installment-plan
pub async fn update_installment_plan(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<PlanPayload>,
) -> AppResult<Json<Order>> {
    let order = state
        .ledger
        .update_installment_plan(&id, payload.count, operator(&headers))
        .await?;
    Ok(Json(order))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecorded {
    pub order: Order,
    pub payment: Payment,
}

/// POST /api/orders/:id/installments/:number/payments
pub async fn record_payment(
    State(state): State<ServerState>,
    Path((id, number)): Path<(String, u32)>,
    headers: HeaderMap,
    Json(input): Json<PaymentInput>,
) -> AppResult<Json<PaymentRecorded>> {
    let (order, payment) = state
        .ledger
        .record_payment(&id, number, input, operator(&headers))
        .await?;
    Ok(Json(PaymentRecorded { order, payment }))
}

/// DELETE /api/orders/:id/installments/:number/payments/:payment_id
pub async fn reverse_payment(
    State(state): State<ServerState>,
    Path((id, number, payment_id)): Path<(String, u32, String)>,
    headers: HeaderMap,
) -> AppResult<Json<Order>> {
    let order = state
        .ledger
        .reverse_payment(&id, number, &payment_id, operator(&headers))
        .await?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueDatePayload {
    pub due_date: NaiveDate,
}

/// PUT /api/orders/:id/installments/:number/due-date
pub async fn update_due_date(
    State(state): State<ServerState>,
    Path((id, number)): Path<(String, u32)>,
    headers: HeaderMap,
    Json(payload): Json<DueDatePayload>,
) -> AppResult<Json<Order>> {
    let order = state
        .ledger
        .update_due_date(&id, number, payload.due_date, operator(&headers))
        .await?;
    Ok(Json(order))
}
