//! Data access layer
//!
//! Typed repositories over the [`DocumentStore`](crate::store::DocumentStore)
//! contract. Repositories own (de)serialization and path construction; all
//! business rules live in `ledger/`.

pub mod repository;

pub use repository::{
    CommissionPaymentRepository, OrderRepository, ProductRepository, RepoError, RepoResult,
};
