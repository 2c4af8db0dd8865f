//! Domain models persisted to the document store.
//!
//! Field names are serialized in camelCase to match the document schema the
//! storefront and seller console already read.

pub mod commission_payment;
pub mod order;
pub mod product;

pub use commission_payment::CommissionPayment;
pub use order::{
    Installment, InstallmentStatus, Order, OrderDraft, OrderItem, OrderItemInput, OrderStatus,
    Payment, PaymentInput, PaymentMethod,
};
pub use product::{CommissionRule, CommissionRuleType, Product, ProductCreate, ProductUpdate};
