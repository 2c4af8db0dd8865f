//! Commission Payment Repository

use super::{RepoError, RepoResult};
use crate::store::{DocPath, Document, DocumentStore, WriteOp};
use shared::models::CommissionPayment;
use std::sync::Arc;

/// Collection name in the document store
pub const COLLECTION: &str = "commissionPayments";

#[derive(Clone)]
pub struct CommissionPaymentRepository {
    store: Arc<dyn DocumentStore>,
}

impl CommissionPaymentRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn path(id: &str) -> DocPath {
        DocPath::new(COLLECTION, id)
    }

    pub fn from_doc(doc: &Document) -> RepoResult<CommissionPayment> {
        let mut payment: CommissionPayment = serde_json::from_value(doc.data.clone())?;
        payment.id = Some(doc.path.id.clone());
        payment.version = doc.version;
        Ok(payment)
    }

    pub async fn find_all(&self) -> RepoResult<Vec<CommissionPayment>> {
        let docs = self.store.list(COLLECTION).await?;
        docs.iter().map(Self::from_doc).collect()
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<CommissionPayment>> {
        match self.store.get(&Self::path(id)).await? {
            Some(doc) => Ok(Some(Self::from_doc(&doc)?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_seller(&self, seller_id: &str) -> RepoResult<Vec<CommissionPayment>> {
        let payments = self.find_all().await?;
        Ok(payments
            .into_iter()
            .filter(|p| p.seller_id == seller_id)
            .collect())
    }

    /// Insert op for a freshly minted payment record (must not exist yet).
    pub fn insert_op(&self, payment: &CommissionPayment) -> RepoResult<WriteOp> {
        let id = payment
            .id
            .as_deref()
            .ok_or_else(|| RepoError::Validation("commission payment is missing an id".into()))?;
        let body = serde_json::to_value(payment)?;
        Ok(WriteOp::set_cas(Self::path(id), body, 0))
    }

    pub fn delete_op(&self, payment: &CommissionPayment) -> RepoResult<WriteOp> {
        let id = payment
            .id
            .as_deref()
            .ok_or_else(|| RepoError::Validation("commission payment is missing an id".into()))?;
        Ok(WriteOp::delete_cas(Self::path(id), payment.version))
    }
}
