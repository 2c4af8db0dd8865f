//! Commission payment record
//!
//! Created once per payroll run. Deleting the record (reversal) must reset
//! `commissionPaid = false` on every order it listed, in the same atomic
//! batch.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionPayment {
    pub id: Option<String>,
    pub seller_id: String,
    /// Sum of the included orders' commissions at pay time
    pub amount: f64,
    /// Payroll period label, e.g. "2024-05"
    pub period: String,
    pub order_ids: Vec<String>,
    /// Timestamp (millis)
    pub payment_date: i64,
    /// Document version for optimistic concurrency, never serialized
    #[serde(skip)]
    pub version: u64,
}
