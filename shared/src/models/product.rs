//! Product Model

use serde::{Deserialize, Serialize};

/// Commission rule kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommissionRuleType {
    /// Fixed amount per unit sold
    Fixed,
    /// Percentage of the line total
    Percentage,
}

/// Seller commission rule attached to a product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommissionRule {
    #[serde(rename = "type")]
    pub rule_type: CommissionRuleType,
    pub value: f64,
}

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Option<String>,
    pub name: String,
    /// Unit price
    pub price: f64,
    /// Available quantity, never negative (enforced by the stock ledger)
    pub stock: i64,
    /// Commission rule; products without one contribute 0 to commission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_rule: Option<CommissionRule>,
    /// Upper bound for Crediário plans containing this product
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_installments: Option<u32>,
    pub is_active: bool,
    /// Creation timestamp (millis)
    pub created_at: i64,
    /// Document version for optimistic concurrency, never serialized
    #[serde(skip)]
    pub version: u64,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreate {
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub commission_rule: Option<CommissionRule>,
    pub max_installments: Option<u32>,
}

/// Update product payload
///
/// `stock` is intentionally absent: available quantity is only ever mutated
/// through the stock ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub commission_rule: Option<CommissionRule>,
    pub max_installments: Option<u32>,
    pub is_active: Option<bool>,
}
