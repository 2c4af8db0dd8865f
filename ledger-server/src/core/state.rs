//! Application State
//!
//! Wires the store, repositories, ledgers and read-side caches together.
//! Cloning is cheap; every field is a handle.

use crate::audit::{AuditLogger, AuditSink};
use crate::core::{Config, ServerResult, StoreBackend};
use crate::db::{CommissionPaymentRepository, OrderRepository, ProductRepository};
use crate::feed::{ChangeFeed, LiveState};
use crate::ledger::{CommissionPayroll, OrderLedger, StockLedger};
use crate::notify::{NotificationSink, TracingNotifier};
use crate::store::{DocumentStore, MemoryStore, RedbStore};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub products: ProductRepository,
    pub orders: OrderRepository,
    pub commission_payments: CommissionPaymentRepository,
    pub ledger: OrderLedger,
    pub payroll: CommissionPayroll,
    pub live: Arc<LiveState>,
    pub audit: Arc<dyn AuditSink>,
    pub notifier: Arc<dyn NotificationSink>,
}

impl ServerState {
    /// Open the configured backend and assemble the full state.
    pub async fn initialize(config: &Config) -> ServerResult<Self> {
        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Redb => {
                let path = Path::new(&config.work_dir).join("ledger.redb");
                Arc::new(RedbStore::open(&path)?)
            }
        };
        Ok(Self::with_store(config.clone(), store))
    }

    /// Assemble the state around an already opened store. Tests use this
    /// with a [`MemoryStore`].
    pub fn with_store(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        let products = ProductRepository::new(store.clone());
        let orders = OrderRepository::new(store.clone());
        let commission_payments = CommissionPaymentRepository::new(store.clone());
        let audit: Arc<dyn AuditSink> = Arc::new(AuditLogger::spawn());
        let notifier: Arc<dyn NotificationSink> = Arc::new(TracingNotifier);
        let stock = StockLedger::new(store.clone(), products.clone());
        let ledger = OrderLedger::new(
            store.clone(),
            orders.clone(),
            products.clone(),
            stock,
            audit.clone(),
            notifier.clone(),
        );
        let payroll = CommissionPayroll::new(
            store.clone(),
            orders.clone(),
            commission_payments.clone(),
            audit.clone(),
            notifier.clone(),
        );

        Self {
            config,
            store,
            products,
            orders,
            commission_payments,
            ledger,
            payroll,
            live: Arc::new(LiveState::new()),
            audit,
            notifier,
        }
    }

    /// Spawn the long-lived background consumers.
    pub fn start_background_tasks(&self) {
        let feed = ChangeFeed::new(self.live.clone());
        let source = self.store.subscribe();
        tokio::spawn(async move { feed.run(source).await });
    }
}
