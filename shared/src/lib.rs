//! Shared types for the storefront back-office
//!
//! Domain models persisted to the document store, plus small time/id
//! utilities used by both the ledger server and its clients.

pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use models::{
    CommissionPayment, CommissionRule, CommissionRuleType, Installment, InstallmentStatus, Order,
    OrderDraft, OrderItem, OrderItemInput, OrderStatus, Payment, PaymentInput, PaymentMethod,
    Product, ProductCreate, ProductUpdate,
};
