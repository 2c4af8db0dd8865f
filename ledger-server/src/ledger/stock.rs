//! Stock Ledger
//!
//! Per-product available quantity with atomic multi-item reservation and
//! release. Reservation is check-then-commit: every item is verified against
//! a freshly fetched product before any write is issued, and all decrements
//! land in one atomic batch, so a failed reservation leaves stock untouched.
//!
//! `reserve_writes`/`release_writes` expose the raw write ops so the order
//! ledger can fold stock deltas and the status write into a single batch —
//! a status transition either fully applies (stock + status) or not at all.

use super::error::{LedgerError, LedgerResult};
use crate::db::ProductRepository;
use crate::store::{DocumentStore, WriteOp};
use shared::models::OrderItem;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct StockLedger {
    store: Arc<dyn DocumentStore>,
    products: ProductRepository,
}

/// Collapse duplicate product lines into one delta per product, preserving
/// first-seen order for deterministic batches.
fn aggregate(items: &[OrderItem]) -> Vec<(String, i64)> {
    let mut totals: HashMap<&str, i64> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for item in items {
        let entry = totals.entry(item.product_id.as_str()).or_insert_with(|| {
            order.push(item.product_id.as_str());
            0
        });
        *entry += item.quantity;
    }
    order
        .into_iter()
        .map(|id| (id.to_string(), totals[id]))
        .collect()
}

fn stock_fields(new_stock: i64) -> serde_json::Map<String, serde_json::Value> {
    let mut fields = serde_json::Map::new();
    fields.insert("stock".to_string(), serde_json::json!(new_stock));
    fields
}

impl StockLedger {
    pub fn new(store: Arc<dyn DocumentStore>, products: ProductRepository) -> Self {
        Self { store, products }
    }

    /// Build the decrement ops for a reservation. Fails with
    /// `InsufficientStock` on the first item that cannot be covered, before
    /// any write op is committed anywhere.
    pub async fn reserve_writes(&self, items: &[OrderItem]) -> LedgerResult<Vec<WriteOp>> {
        let mut writes = Vec::new();
        for (product_id, requested) in aggregate(items) {
            let current = self
                .products
                .find_by_id(&product_id)
                .await?
                .ok_or_else(|| LedgerError::ProductNotFound(product_id.clone()))?;
            if current.stock < requested {
                return Err(LedgerError::InsufficientStock {
                    product_id,
                    available: current.stock,
                    requested,
                });
            }
            writes.push(WriteOp::update_cas(
                ProductRepository::path(&product_id),
                stock_fields(current.stock - requested),
                current.version,
            ));
        }
        Ok(writes)
    }

    /// Build the increment ops for a release. Always succeeds for existing
    /// products (no upper bound); a product deleted since the order was
    /// placed is skipped with a warning rather than blocking the release.
    pub async fn release_writes(&self, items: &[OrderItem]) -> LedgerResult<Vec<WriteOp>> {
        let mut writes = Vec::new();
        for (product_id, quantity) in aggregate(items) {
            let Some(current) = self.products.find_by_id(&product_id).await? else {
                tracing::warn!(product_id = %product_id, "release skipped, product no longer exists");
                continue;
            };
            writes.push(WriteOp::update_cas(
                ProductRepository::path(&product_id),
                stock_fields(current.stock + quantity),
                current.version,
            ));
        }
        Ok(writes)
    }

    /// Standalone reservation: all decrements in one atomic batch.
    pub async fn reserve(&self, items: &[OrderItem]) -> LedgerResult<()> {
        let writes = self.reserve_writes(items).await?;
        self.store.atomic_batch(writes).await?;
        Ok(())
    }

    /// Standalone release: symmetric increment, persisted atomically.
    pub async fn release(&self, items: &[OrderItem]) -> LedgerResult<()> {
        let writes = self.release_writes(items).await?;
        self.store.atomic_batch(writes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use shared::models::ProductCreate;

    fn item(product_id: &str, quantity: i64) -> OrderItem {
        OrderItem {
            product_id: product_id.to_string(),
            name: "Produto".to_string(),
            quantity,
            price: 10.0,
        }
    }

    async fn fixture(stock: i64) -> (StockLedger, ProductRepository, String) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let products = ProductRepository::new(store.clone());
        let created = products
            .create(ProductCreate {
                name: "Tênis".to_string(),
                price: 10.0,
                stock,
                commission_rule: None,
                max_installments: None,
            })
            .await
            .unwrap();
        let ledger = StockLedger::new(store, products.clone());
        (ledger, products, created.id.unwrap())
    }

    #[tokio::test]
    async fn reserve_decrements_and_release_restores() {
        let (ledger, products, id) = fixture(5).await;

        ledger.reserve(&[item(&id, 3)]).await.unwrap();
        assert_eq!(products.find_by_id(&id).await.unwrap().unwrap().stock, 2);

        ledger.release(&[item(&id, 3)]).await.unwrap();
        assert_eq!(products.find_by_id(&id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn exhausting_stock_then_reserving_fails_typed() {
        let (ledger, products, id) = fixture(5).await;

        ledger.reserve(&[item(&id, 5)]).await.unwrap();
        assert_eq!(products.find_by_id(&id).await.unwrap().unwrap().stock, 0);

        let err = ledger.reserve(&[item(&id, 1)]).await.unwrap_err();
        match err {
            LedgerError::InsufficientStock {
                product_id,
                available,
                requested,
            } => {
                assert_eq!(product_id, id);
                assert_eq!(available, 0);
                assert_eq!(requested, 1);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
        // Failed reservation leaves stock unchanged
        assert_eq!(products.find_by_id(&id).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn multi_item_reserve_is_all_or_nothing() {
        let (ledger, products, id_a) = fixture(5).await;
        let id_b = {
            let created = products
                .create(ProductCreate {
                    name: "Meia".to_string(),
                    price: 5.0,
                    stock: 1,
                    commission_rule: None,
                    max_installments: None,
                })
                .await
                .unwrap();
            created.id.unwrap()
        };

        let err = ledger
            .reserve(&[item(&id_a, 2), item(&id_b, 3)])
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { .. }));

        // No partial reservation: product A untouched
        assert_eq!(products.find_by_id(&id_a).await.unwrap().unwrap().stock, 5);
        assert_eq!(products.find_by_id(&id_b).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn duplicate_lines_aggregate_before_checking() {
        let (ledger, products, id) = fixture(5).await;

        // 3 + 3 = 6 > 5 even though each line alone would fit
        let err = ledger
            .reserve(&[item(&id, 3), item(&id, 3)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            }
        ));

        ledger.reserve(&[item(&id, 2), item(&id, 3)]).await.unwrap();
        assert_eq!(products.find_by_id(&id).await.unwrap().unwrap().stock, 0);
    }
}
