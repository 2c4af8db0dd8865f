//! Repository Module
//!
//! Provides CRUD operations over document-store collections.

pub mod commission_payment;
pub mod order;
pub mod product;

// Re-exports
pub use commission_payment::CommissionPaymentRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;

use crate::store::StoreError;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

// =============================================================================
// ID convention: documents are addressed as "collection/id"; the `id` field
// inside the document body mirrors the path id. Repositories always
// re-stamp `id` and `version` from the document on read, so a stale or
// missing body id never leaks.
// =============================================================================
