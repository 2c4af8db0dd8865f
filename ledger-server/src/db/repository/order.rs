//! Order Repository
//!
//! Read access plus write-op builders. All order mutations go through the
//! order ledger, which composes these ops into atomic batches alongside
//! stock and commission writes; the repository never commits an order write
//! on its own.

use super::{RepoError, RepoResult};
use crate::store::{DocPath, Document, DocumentStore, WriteOp};
use shared::models::{Order, OrderStatus};
use std::sync::Arc;

/// Collection name in the document store
pub const COLLECTION: &str = "orders";

#[derive(Clone)]
pub struct OrderRepository {
    store: Arc<dyn DocumentStore>,
}

impl OrderRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn path(id: &str) -> DocPath {
        DocPath::new(COLLECTION, id)
    }

    pub fn from_doc(doc: &Document) -> RepoResult<Order> {
        let mut order: Order = serde_json::from_value(doc.data.clone())?;
        order.id = Some(doc.path.id.clone());
        order.version = doc.version;
        Ok(order)
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        match self.store.get(&Self::path(id)).await? {
            Some(doc) => Ok(Some(Self::from_doc(&doc)?)),
            None => Ok(None),
        }
    }

    /// All orders except soft-deleted ones (the seller console default view).
    pub async fn find_all(&self) -> RepoResult<Vec<Order>> {
        let orders = self.find_everything().await?;
        Ok(orders
            .into_iter()
            .filter(|o| o.status != OrderStatus::Excluido)
            .collect())
    }

    /// Every order including soft-deleted (trash view, reconciliation).
    pub async fn find_everything(&self) -> RepoResult<Vec<Order>> {
        let docs = self.store.list(COLLECTION).await?;
        docs.iter().map(Self::from_doc).collect()
    }

    pub async fn find_by_status(&self, status: OrderStatus) -> RepoResult<Vec<Order>> {
        let orders = self.find_everything().await?;
        Ok(orders.into_iter().filter(|o| o.status == status).collect())
    }

    pub async fn find_by_seller(&self, seller_id: &str) -> RepoResult<Vec<Order>> {
        let orders = self.find_all().await?;
        Ok(orders
            .into_iter()
            .filter(|o| o.seller_id.as_deref() == Some(seller_id))
            .collect())
    }

    /// Full-document write op carrying the order's version as CAS guard.
    /// Version 0 (fresh order) doubles as a "must not exist" insert guard.
    pub fn set_op(&self, order: &Order) -> RepoResult<WriteOp> {
        let id = order
            .id
            .as_deref()
            .ok_or_else(|| RepoError::Validation("order is missing an id".into()))?;
        let body = serde_json::to_value(order)?;
        Ok(WriteOp::set_cas(Self::path(id), body, order.version))
    }

    pub fn delete_op(&self, order: &Order) -> RepoResult<WriteOp> {
        let id = order
            .id
            .as_deref()
            .ok_or_else(|| RepoError::Validation("order is missing an id".into()))?;
        Ok(WriteOp::delete_cas(Self::path(id), order.version))
    }
}
