//! Ledger core
//!
//! Business rules over the document store: stock movements, the order
//! lifecycle, installment accounts, commission rules and their settlement.
//! Everything here is backend-agnostic; persistence goes through
//! [`crate::store::DocumentStore`] and the repositories in [`crate::db`].

pub mod commission;
pub mod error;
pub mod installment;
pub mod money;
pub mod orders;
pub mod payroll;
pub mod stock;

pub use error::{LedgerError, LedgerResult};
pub use orders::OrderLedger;
pub use payroll::CommissionPayroll;
pub use stock::StockLedger;
