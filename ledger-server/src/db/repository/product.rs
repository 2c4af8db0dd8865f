//! Product Repository
//!
//! Catalog reads for the commission engine and stock ledger, plus the CRUD
//! surface for the admin console. The `stock` field is never written here:
//! stock mutations are built by the stock ledger as CAS write ops so they
//! can ride inside an order transition's atomic batch.

use super::{RepoError, RepoResult};
use crate::store::{DocPath, Document, DocumentStore, WriteOp};
use shared::models::{Product, ProductCreate, ProductUpdate};
use shared::util;
use std::collections::HashMap;
use std::sync::Arc;

/// Collection name in the document store
pub const COLLECTION: &str = "products";

#[derive(Clone)]
pub struct ProductRepository {
    store: Arc<dyn DocumentStore>,
}

impl ProductRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn path(id: &str) -> DocPath {
        DocPath::new(COLLECTION, id)
    }

    pub fn from_doc(doc: &Document) -> RepoResult<Product> {
        let mut product: Product = serde_json::from_value(doc.data.clone())?;
        product.id = Some(doc.path.id.clone());
        product.version = doc.version;
        Ok(product)
    }

    pub async fn find_all(&self) -> RepoResult<Vec<Product>> {
        let docs = self.store.list(COLLECTION).await?;
        docs.iter().map(Self::from_doc).collect()
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Product>> {
        match self.store.get(&Self::path(id)).await? {
            Some(doc) => Ok(Some(Self::from_doc(&doc)?)),
            None => Ok(None),
        }
    }

    /// Fetch the products referenced by an order, keyed by id. Missing
    /// products are simply absent from the map; callers decide whether that
    /// is an error (stock ledger) or a zero contribution (commission).
    pub async fn find_many(&self, ids: &[String]) -> RepoResult<HashMap<String, Product>> {
        let mut result = HashMap::with_capacity(ids.len());
        for id in ids {
            if result.contains_key(id) {
                continue;
            }
            if let Some(product) = self.find_by_id(id).await? {
                result.insert(id.clone(), product);
            }
        }
        Ok(result)
    }

    pub async fn create(&self, data: ProductCreate) -> RepoResult<Product> {
        if data.name.trim().is_empty() {
            return Err(RepoError::Validation("product name is required".into()));
        }
        if !data.price.is_finite() || data.price < 0.0 {
            return Err(RepoError::Validation("price must be non-negative".into()));
        }
        if data.stock < 0 {
            return Err(RepoError::Validation("stock must be non-negative".into()));
        }

        let id = util::snowflake_id().to_string();
        let product = Product {
            id: Some(id.clone()),
            name: data.name,
            price: data.price,
            stock: data.stock,
            commission_rule: data.commission_rule,
            max_installments: data.max_installments,
            is_active: true,
            created_at: util::now_millis(),
            version: 0,
        };
        let body = serde_json::to_value(&product)?;
        self.store
            .atomic_batch(vec![WriteOp::set_cas(Self::path(&id), body, 0)])
            .await?;
        Ok(Product {
            version: 1,
            ..product
        })
    }

    pub async fn update(&self, id: &str, data: ProductUpdate) -> RepoResult<Product> {
        let mut product = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Product {}", id)))?;

        if let Some(name) = data.name {
            product.name = name;
        }
        if let Some(price) = data.price {
            if !price.is_finite() || price < 0.0 {
                return Err(RepoError::Validation("price must be non-negative".into()));
            }
            product.price = price;
        }
        if let Some(rule) = data.commission_rule {
            product.commission_rule = Some(rule);
        }
        if let Some(max) = data.max_installments {
            product.max_installments = Some(max);
        }
        if let Some(active) = data.is_active {
            product.is_active = active;
        }

        let body = serde_json::to_value(&product)?;
        self.store
            .atomic_batch(vec![WriteOp::set_cas(
                Self::path(id),
                body,
                product.version,
            )])
            .await?;
        product.version += 1;
        Ok(product)
    }

    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        if self.store.get(&Self::path(id)).await?.is_none() {
            return Ok(false);
        }
        self.store.delete(&Self::path(id)).await?;
        Ok(true)
    }
}
