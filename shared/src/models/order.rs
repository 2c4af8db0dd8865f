//! Order, Installment and Payment models
//!
//! The order document embeds its full installment plan
//! (`installmentDetails`), each installment carrying its own append-only
//! payment list. Installment `status` and `paidAmount` are derived fields,
//! always recomputed from the payment list and never adjusted by delta.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Status enums
// ============================================================================

/// Order lifecycle status.
///
/// `Cancelado` and `Excluido` form the *inactive* set: orders there hold no
/// stock. Every transition across the active/inactive boundary moves stock
/// exactly once; transitions within a set never touch it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum OrderStatus {
    #[default]
    Processando,
    Enviado,
    Entregue,
    Cancelado,
    #[serde(rename = "Excluído")]
    Excluido,
}

impl OrderStatus {
    /// Whether an order in this status holds reserved stock.
    pub fn is_active(&self) -> bool {
        !matches!(self, OrderStatus::Cancelado | OrderStatus::Excluido)
    }
}

/// Payment method chosen at checkout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PaymentMethod {
    /// Store-financed installment plan
    #[serde(rename = "Crediário")]
    Crediario,
    #[default]
    Pix,
    Dinheiro,
}

/// Derived installment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum InstallmentStatus {
    #[default]
    Pendente,
    Pago,
}

// ============================================================================
// Embedded documents
// ============================================================================

/// One recorded payment against an installment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    /// Always positive; reversals remove the entry instead of appending a
    /// negative one
    pub amount: f64,
    pub date: NaiveDate,
    pub method: PaymentMethod,
    /// Cash change handed back, informational only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
}

/// One scheduled partial payment of an order's total
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    /// 1-based, unique within the order
    pub installment_number: u32,
    /// Fixed at plan generation, immutable afterwards
    pub amount: f64,
    pub due_date: NaiveDate,
    /// Derived: `Pago` iff `|paid_amount - amount| < 0.01`
    pub status: InstallmentStatus,
    /// Derived: exact sum of `payments[].amount`
    pub paid_amount: f64,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

/// Order line item — unit price snapshot taken at creation, immutable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    /// Unit price at the time the order was placed
    pub price: f64,
}

// ============================================================================
// Order
// ============================================================================

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: String,
    /// Immutable after creation
    pub items: Vec<OrderItem>,
    /// Sum of line items, immutable after creation
    pub total: f64,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub seller_id: Option<String>,
    pub seller_name: Option<String>,
    /// Derived from product rules on entering Entregue, or manually pinned
    pub commission: f64,
    pub is_commission_manual: bool,
    pub commission_paid: bool,
    /// Empty unless `payment_method` is Crediário
    #[serde(default)]
    pub installment_details: Vec<Installment>,
    /// Creation timestamp (millis)
    pub created_at: i64,
    /// Document version for optimistic concurrency, never serialized
    #[serde(skip)]
    pub version: u64,
}

impl Order {
    pub fn installment(&self, number: u32) -> Option<&Installment> {
        self.installment_details
            .iter()
            .find(|i| i.installment_number == number)
    }

    pub fn installment_mut(&mut self, number: u32) -> Option<&mut Installment> {
        self.installment_details
            .iter_mut()
            .find(|i| i.installment_number == number)
    }

    /// Whether any payment has been recorded against any installment.
    pub fn has_payments(&self) -> bool {
        self.installment_details.iter().any(|i| !i.payments.is_empty())
    }

    /// Creation date in UTC, used as the anchor for installment schedules.
    pub fn created_date(&self) -> NaiveDate {
        DateTime::<Utc>::from_timestamp_millis(self.created_at)
            .unwrap_or_else(Utc::now)
            .date_naive()
    }
}

// ============================================================================
// Input payloads
// ============================================================================

/// Line item as submitted from checkout or the seller console
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub product_id: String,
    pub quantity: i64,
}

/// New order payload (checkout or manual seller entry)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub items: Vec<OrderItemInput>,
    pub payment_method: PaymentMethod,
    pub seller_id: Option<String>,
    pub seller_name: Option<String>,
    /// Required when `payment_method` is Crediário
    pub installment_count: Option<u32>,
}

/// Payment as submitted by the seller console
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    pub amount: f64,
    pub method: PaymentMethod,
    /// Defaults to today when absent
    pub date: Option<NaiveDate>,
    /// Cash tendered by the customer (Dinheiro only); excess becomes change
    pub tendered: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_with_accents() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Excluido).unwrap(),
            "\"Excluído\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Crediario).unwrap(),
            "\"Crediário\""
        );
        let back: OrderStatus = serde_json::from_str("\"Excluído\"").unwrap();
        assert_eq!(back, OrderStatus::Excluido);
    }

    #[test]
    fn active_set_excludes_cancelled_and_deleted() {
        assert!(OrderStatus::Processando.is_active());
        assert!(OrderStatus::Enviado.is_active());
        assert!(OrderStatus::Entregue.is_active());
        assert!(!OrderStatus::Cancelado.is_active());
        assert!(!OrderStatus::Excluido.is_active());
    }
}
