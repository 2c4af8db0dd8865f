//! Change feed consumer
//!
//! ```text
//! DocumentStore (broadcast)
//!        │
//!        └── ChangeFeed
//!               └── LiveState ──► console subscribers (broadcast)
//! ```
//!
//! Bridges the store's raw change feed into typed [`LedgerUpdate`]s and the
//! [`LiveState`] caches. Strictly read-side: a dropped or lagged event can
//! stale the console until the next change, never corrupt the ledger.

pub mod live_state;

pub use live_state::{LedgerUpdate, LiveState};

use crate::db::repository::{commission_payment, order, product};
use crate::db::{CommissionPaymentRepository, OrderRepository, ProductRepository};
use crate::store::{Document, StoreEvent};
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct ChangeFeed {
    live: Arc<LiveState>,
}

impl ChangeFeed {
    pub fn new(live: Arc<LiveState>) -> Self {
        Self { live }
    }

    /// Run until the store's event channel closes.
    pub async fn run(self, mut source: broadcast::Receiver<StoreEvent>) {
        tracing::info!("Change feed started");

        loop {
            match source.recv().await {
                Ok(event) => {
                    if let Some(update) = Self::translate(event) {
                        self.live.apply(update);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Caches may be stale until the next write lands; the
                    // ledger itself reads through the repositories and is
                    // unaffected.
                    tracing::error!(skipped = n, "Change feed lagged, console state may be stale");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Store event channel closed, change feed stopping");
                    break;
                }
            }
        }
    }

    fn translate(event: StoreEvent) -> Option<LedgerUpdate> {
        match event {
            StoreEvent::Changed(doc) => Self::translate_changed(&doc),
            StoreEvent::Removed(path) => match path.collection.as_str() {
                order::COLLECTION => Some(LedgerUpdate::OrderRemoved(path.id)),
                product::COLLECTION => Some(LedgerUpdate::ProductRemoved(path.id)),
                commission_payment::COLLECTION => {
                    Some(LedgerUpdate::CommissionPaymentRemoved(path.id))
                }
                _ => None,
            },
        }
    }

    fn translate_changed(doc: &Document) -> Option<LedgerUpdate> {
        let result = match doc.path.collection.as_str() {
            order::COLLECTION => OrderRepository::from_doc(doc).map(LedgerUpdate::OrderChanged),
            product::COLLECTION => {
                ProductRepository::from_doc(doc).map(LedgerUpdate::ProductChanged)
            }
            commission_payment::COLLECTION => CommissionPaymentRepository::from_doc(doc)
                .map(LedgerUpdate::CommissionPaymentChanged),
            _ => return None,
        };
        match result {
            Ok(update) => Some(update),
            Err(err) => {
                // A malformed document in the feed is a bug upstream, not a
                // reason to kill the consumer.
                tracing::error!(path = %doc.path, ?err, "undecodable document in change feed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ProductRepository;
    use crate::store::{DocumentStore, MemoryStore};
    use shared::models::ProductCreate;
    use std::time::Duration;

    #[tokio::test]
    async fn feed_mirrors_writes_and_removals() {
        let store = Arc::new(MemoryStore::new());
        let live = Arc::new(LiveState::new());
        let feed = ChangeFeed::new(live.clone());
        let source = store.subscribe();
        tokio::spawn(async move { feed.run(source).await });

        let products = ProductRepository::new(store.clone());
        let mut updates = live.subscribe();

        let created = products
            .create(ProductCreate {
                name: "Tênis".to_string(),
                price: 99.9,
                stock: 4,
                commission_rule: None,
                max_installments: None,
            })
            .await
            .unwrap();
        let id = created.id.clone().unwrap();

        match tokio::time::timeout(Duration::from_secs(1), updates.recv())
            .await
            .unwrap()
            .unwrap()
        {
            LedgerUpdate::ProductChanged(p) => assert_eq!(p.id.as_deref(), Some(id.as_str())),
            other => panic!("expected ProductChanged, got {:?}", other),
        }
        assert_eq!(live.products().len(), 1);

        products.delete(&id).await.unwrap();
        match tokio::time::timeout(Duration::from_secs(1), updates.recv())
            .await
            .unwrap()
            .unwrap()
        {
            LedgerUpdate::ProductRemoved(removed) => assert_eq!(removed, id),
            other => panic!("expected ProductRemoved, got {:?}", other),
        }
        assert!(live.products().is_empty());
    }
}
