//! In-memory mirror of the store, fed by the change feed.
//!
//! Read-side only: the ledger never consults these caches for business
//! decisions (those always go through the repositories), so a lagging feed
//! can cost a console refresh but never a wrong write.

use dashmap::DashMap;
use shared::models::{CommissionPayment, Order, Product};
use tokio::sync::broadcast;

const UPDATE_BUFFER: usize = 256;

/// One applied change, fanned out to console subscribers.
#[derive(Debug, Clone)]
pub enum LedgerUpdate {
    OrderChanged(Order),
    OrderRemoved(String),
    ProductChanged(Product),
    ProductRemoved(String),
    CommissionPaymentChanged(CommissionPayment),
    CommissionPaymentRemoved(String),
}

pub struct LiveState {
    orders: DashMap<String, Order>,
    products: DashMap<String, Product>,
    commission_payments: DashMap<String, CommissionPayment>,
    updates: broadcast::Sender<LedgerUpdate>,
}

impl LiveState {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        Self {
            orders: DashMap::new(),
            products: DashMap::new(),
            commission_payments: DashMap::new(),
            updates,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerUpdate> {
        self.updates.subscribe()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.iter().map(|e| e.value().clone()).collect()
    }

    pub fn products(&self) -> Vec<Product> {
        self.products.iter().map(|e| e.value().clone()).collect()
    }

    pub fn commission_payments(&self) -> Vec<CommissionPayment> {
        self.commission_payments
            .iter()
            .map(|e| e.value().clone())
            .collect()
    }

    /// Apply one update to the caches and fan it out. A send error only
    /// means nobody is listening right now.
    pub fn apply(&self, update: LedgerUpdate) {
        match &update {
            LedgerUpdate::OrderChanged(order) => {
                if let Some(id) = &order.id {
                    self.orders.insert(id.clone(), order.clone());
                }
            }
            LedgerUpdate::OrderRemoved(id) => {
                self.orders.remove(id);
            }
            LedgerUpdate::ProductChanged(product) => {
                if let Some(id) = &product.id {
                    self.products.insert(id.clone(), product.clone());
                }
            }
            LedgerUpdate::ProductRemoved(id) => {
                self.products.remove(id);
            }
            LedgerUpdate::CommissionPaymentChanged(payment) => {
                if let Some(id) = &payment.id {
                    self.commission_payments.insert(id.clone(), payment.clone());
                }
            }
            LedgerUpdate::CommissionPaymentRemoved(id) => {
                self.commission_payments.remove(id);
            }
        }
        let _ = self.updates.send(update);
    }
}

impl Default for LiveState {
    fn default() -> Self {
        Self::new()
    }
}
