//! Ledger error taxonomy
//!
//! Every operation returns either the updated entity or one of these typed
//! failures. Nothing is retried automatically except the bounded CAS loop
//! on version conflicts; store errors surface verbatim.

use crate::db::RepoError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// A reservation would drive stock negative. Aborts the whole operation
    /// with no partial write.
    #[error(
        "Insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Installment {number} not found on order {order_id}")]
    InstallmentNotFound { order_id: String, number: u32 },

    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// Operation rejected in the entity's current state (e.g. permanent
    /// delete of a non-Excluído order, plan regeneration with payments).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Repository error: {0}")]
    Repo(RepoError),
}

impl From<RepoError> for LedgerError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Store(e) => LedgerError::Store(e),
            other => LedgerError::Repo(other),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
