//! Order Ledger
//!
//! Lifecycle orchestration for orders: creation with stock reservation,
//! status transitions that move stock and commission in the same atomic
//! batch, the installment payment surface, and the manual commission pin.
//!
//! Every mutation is a fetch-compute-write cycle guarded by the order's
//! document version. On a version conflict the whole cycle is retried from
//! a fresh read, at most [`CAS_ATTEMPTS`] times; business rules are always
//! re-evaluated against the latest snapshot, never against stale state.

use super::commission;
use super::error::{LedgerError, LedgerResult};
use super::installment;
use super::money;
use super::stock::StockLedger;
use crate::audit::{AuditAction, AuditSink};
use crate::db::{OrderRepository, ProductRepository};
use crate::notify::{NotificationSink, Severity};
use crate::store::{DocumentStore, StoreError};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::models::{
    InstallmentStatus, Order, OrderDraft, OrderItem, OrderStatus, Payment, PaymentInput,
    PaymentMethod, Product,
};
use shared::util;
use std::collections::HashMap;
use std::sync::Arc;

/// Bounded retries for version-conflict races. Two concurrent writers is
/// the realistic worst case for a single storefront; three attempts keeps
/// the tail latency flat instead of looping on a hot document.
const CAS_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct OrderLedger {
    store: Arc<dyn DocumentStore>,
    orders: OrderRepository,
    products: ProductRepository,
    stock: StockLedger,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn NotificationSink>,
}

impl OrderLedger {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        orders: OrderRepository,
        products: ProductRepository,
        stock: StockLedger,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            orders,
            products,
            stock,
            audit,
            notifier,
        }
    }

    async fn fetch(&self, order_id: &str) -> LedgerResult<Order> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))
    }

    /// Products referenced by the order, keyed by id. Vanished products are
    /// simply absent (they contribute zero commission).
    async fn catalog_for(&self, items: &[OrderItem]) -> LedgerResult<HashMap<String, Product>> {
        let ids: Vec<String> = items.iter().map(|i| i.product_id.clone()).collect();
        Ok(self.products.find_many(&ids).await?)
    }

    /// Recompute the commission fields for the order's current status.
    ///
    /// Automatic commission exists only while the order sits in Entregue;
    /// everywhere else it is zeroed and unmarked as paid. A manual pin is
    /// never touched.
    fn apply_commission(order: &mut Order, catalog: &HashMap<String, Product>) {
        if order.is_commission_manual {
            return;
        }
        if order.status == OrderStatus::Entregue {
            order.commission = commission::compute(order, catalog);
        } else {
            order.commission = 0.0;
            order.commission_paid = false;
        }
    }

    /// Fetch-mutate-persist cycle with bounded retry on version conflicts.
    /// The closure runs against a fresh snapshot on every attempt.
    async fn mutate<F>(&self, order_id: &str, mut apply: F) -> LedgerResult<Order>
    where
        F: FnMut(&mut Order) -> LedgerResult<()>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut order = self.fetch(order_id).await?;
            apply(&mut order)?;
            let op = self.orders.set_op(&order)?;
            match self.store.atomic_batch(vec![op]).await {
                Ok(()) => {
                    order.version += 1;
                    return Ok(order);
                }
                Err(StoreError::VersionConflict { .. }) if attempt < CAS_ATTEMPTS => {
                    tracing::debug!(order_id, attempt, "version conflict, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create an order: snapshot names and prices from the catalog, reserve
    /// stock, and generate the Crediário plan when applicable. Reservation
    /// and insertion land in one atomic batch, so an insufficient-stock
    /// failure leaves nothing behind.
    pub async fn create(&self, draft: OrderDraft, actor: &str) -> LedgerResult<Order> {
        if draft.items.is_empty() {
            return Err(LedgerError::Validation(
                "order must contain at least one item".to_string(),
            ));
        }
        if draft.customer_name.trim().is_empty() {
            return Err(LedgerError::Validation("customer name is required".to_string()));
        }
        for item in &draft.items {
            if item.quantity <= 0 {
                return Err(LedgerError::Validation(format!(
                    "quantity for product {} must be positive",
                    item.product_id
                )));
            }
        }

        let mut attempt = 0;
        loop {
            attempt += 1;

            // Snapshot catalog data per attempt so a concurrent price change
            // cannot mix old and new values within one order.
            let mut items = Vec::with_capacity(draft.items.len());
            for input in &draft.items {
                let product = self
                    .products
                    .find_by_id(&input.product_id)
                    .await?
                    .ok_or_else(|| LedgerError::ProductNotFound(input.product_id.clone()))?;
                if !product.is_active {
                    return Err(LedgerError::Validation(format!(
                        "product {} is not available for sale",
                        product.name
                    )));
                }
                items.push(OrderItem {
                    product_id: input.product_id.clone(),
                    name: product.name,
                    quantity: input.quantity,
                    price: product.price,
                });
            }

            let total = money::to_f64(
                items
                    .iter()
                    .map(|i| money::to_decimal(i.price) * Decimal::from(i.quantity))
                    .sum(),
            );

            let mut order = Order {
                id: Some(util::snowflake_id().to_string()),
                customer_id: draft.customer_id.clone(),
                customer_name: draft.customer_name.clone(),
                items,
                total,
                status: OrderStatus::Processando,
                payment_method: draft.payment_method,
                seller_id: draft.seller_id.clone(),
                seller_name: draft.seller_name.clone(),
                commission: 0.0,
                is_commission_manual: false,
                commission_paid: false,
                installment_details: Vec::new(),
                created_at: util::now_millis(),
                version: 0,
            };

            if draft.payment_method == PaymentMethod::Crediario {
                let count = draft.installment_count.ok_or_else(|| {
                    LedgerError::Validation(
                        "installment count is required for Crediário orders".to_string(),
                    )
                })?;
                self.check_installment_cap(&order, count).await?;
                order.installment_details =
                    installment::generate_plan(order.total, count, order.created_date())?;
            }

            let mut writes = self.stock.reserve_writes(&order.items).await?;
            writes.push(self.orders.set_op(&order)?);

            match self.store.atomic_batch(writes).await {
                Ok(()) => {
                    order.version = 1;
                    let id = order.id.as_deref().unwrap_or_default();
                    self.audit.record(
                        AuditAction::OrderCreated,
                        format!("order {} created for {}, total {:.2}", id, order.customer_name, order.total),
                        actor,
                    );
                    self.notifier.notify(
                        Severity::Info,
                        &format!("New order for {} ({:.2})", order.customer_name, order.total),
                    );
                    return Ok(order);
                }
                // A concurrent sale bumped a product version between the
                // availability check and the commit; re-read and retry.
                Err(StoreError::VersionConflict { .. }) if attempt < CAS_ATTEMPTS => {
                    tracing::debug!(attempt, "stock version conflict on create, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// The tightest `max_installments` across the order's products bounds
    /// the plan length.
    async fn check_installment_cap(&self, order: &Order, count: u32) -> LedgerResult<()> {
        let catalog = self.catalog_for(&order.items).await?;
        let cap = order
            .items
            .iter()
            .filter_map(|i| catalog.get(&i.product_id))
            .filter_map(|p| p.max_installments)
            .min();
        if let Some(cap) = cap
            && count > cap
        {
            return Err(LedgerError::Validation(format!(
                "installment count {} exceeds the maximum of {} for this order",
                count, cap
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Status transitions
    // ========================================================================

    /// Move an order to `new_status`.
    ///
    /// Stock follows the active/inactive boundary: leaving the active set
    /// releases the order's quantities, re-entering reserves them again
    /// (failing with `InsufficientStock` if the goods were sold meanwhile).
    /// Stock deltas, commission recomputation and the status write commit in
    /// one atomic batch.
    pub async fn transition(
        &self,
        order_id: &str,
        new_status: OrderStatus,
        actor: &str,
    ) -> LedgerResult<Order> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut order = self.fetch(order_id).await?;
            let old_status = order.status;
            if old_status == new_status {
                return Ok(order);
            }

            let mut writes = match (old_status.is_active(), new_status.is_active()) {
                (false, true) => self.stock.reserve_writes(&order.items).await?,
                (true, false) => self.stock.release_writes(&order.items).await?,
                _ => Vec::new(),
            };

            order.status = new_status;
            let catalog = self.catalog_for(&order.items).await?;
            Self::apply_commission(&mut order, &catalog);

            writes.push(self.orders.set_op(&order)?);
            match self.store.atomic_batch(writes).await {
                Ok(()) => {
                    order.version += 1;
                    self.audit.record(
                        AuditAction::OrderStatusChanged,
                        format!("order {} moved {:?} -> {:?}", order_id, old_status, new_status),
                        actor,
                    );
                    if new_status == OrderStatus::Entregue {
                        self.notifier.notify(
                            Severity::Info,
                            &format!("Order {} delivered to {}", order_id, order.customer_name),
                        );
                    }
                    return Ok(order);
                }
                Err(StoreError::VersionConflict { .. }) if attempt < CAS_ATTEMPTS => {
                    tracing::debug!(order_id, attempt, "version conflict on transition, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Soft delete: park the order in Excluído. Stock is released like any
    /// other exit from the active set; the document stays in the store.
    pub async fn soft_delete(&self, order_id: &str, actor: &str) -> LedgerResult<Order> {
        self.transition(order_id, OrderStatus::Excluido, actor).await
    }

    /// Bring a soft-deleted order back as Processando, re-reserving stock.
    pub async fn restore(&self, order_id: &str, actor: &str) -> LedgerResult<Order> {
        let order = self.fetch(order_id).await?;
        if order.status != OrderStatus::Excluido {
            return Err(LedgerError::InvalidState(format!(
                "order {} is not deleted",
                order_id
            )));
        }
        let restored = self
            .transition(order_id, OrderStatus::Processando, actor)
            .await?;
        self.audit.record(
            AuditAction::OrderRestored,
            format!("order {} restored from trash", order_id),
            actor,
        );
        Ok(restored)
    }

    /// Remove the document for good. Only reachable from Excluído, so the
    /// stock was already released and no quantities can leak.
    pub async fn permanently_delete(&self, order_id: &str, actor: &str) -> LedgerResult<()> {
        let order = self.fetch(order_id).await?;
        if order.status != OrderStatus::Excluido {
            return Err(LedgerError::InvalidState(format!(
                "order {} must be deleted before it can be removed permanently",
                order_id
            )));
        }
        let op = self.orders.delete_op(&order)?;
        self.store.atomic_batch(vec![op]).await?;
        self.audit.record(
            AuditAction::OrderPermanentlyDeleted,
            format!("order {} permanently removed", order_id),
            actor,
        );
        Ok(())
    }

    // ========================================================================
    // Seller and commission
    // ========================================================================

    /// Reassign the responsible seller. An automatic commission on a
    /// delivered order is recomputed so the new seller's figure reflects the
    /// current rules.
    pub async fn reassign_seller(
        &self,
        order_id: &str,
        seller_id: Option<String>,
        seller_name: Option<String>,
        actor: &str,
    ) -> LedgerResult<Order> {
        let order = self.fetch(order_id).await?;
        let catalog = self.catalog_for(&order.items).await?;

        let updated = self
            .mutate(order_id, |order| {
                order.seller_id = seller_id.clone();
                order.seller_name = seller_name.clone();
                Self::apply_commission(order, &catalog);
                Ok(())
            })
            .await?;
        self.audit.record(
            AuditAction::SellerReassigned,
            format!(
                "order {} assigned to {}",
                order_id,
                updated.seller_name.as_deref().unwrap_or("nobody")
            ),
            actor,
        );
        Ok(updated)
    }

    /// Pin the commission to a fixed amount. The pin survives status
    /// transitions and rule changes until explicitly cleared.
    pub async fn set_manual_commission(
        &self,
        order_id: &str,
        amount: f64,
        actor: &str,
    ) -> LedgerResult<Order> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(LedgerError::Validation(
                "manual commission must be non-negative".to_string(),
            ));
        }
        let updated = self
            .mutate(order_id, |order| {
                order.commission = amount;
                order.is_commission_manual = true;
                Ok(())
            })
            .await?;
        self.audit.record(
            AuditAction::CommissionPinned,
            format!("order {} commission pinned at {:.2}", order_id, amount),
            actor,
        );
        Ok(updated)
    }

    /// Drop the pin and fall back to rule evaluation for the current status.
    pub async fn clear_manual_commission(
        &self,
        order_id: &str,
        actor: &str,
    ) -> LedgerResult<Order> {
        let order = self.fetch(order_id).await?;
        let catalog = self.catalog_for(&order.items).await?;

        let updated = self
            .mutate(order_id, |order| {
                order.is_commission_manual = false;
                Self::apply_commission(order, &catalog);
                Ok(())
            })
            .await?;
        self.audit.record(
            AuditAction::CommissionCleared,
            format!("order {} commission back to automatic", order_id),
            actor,
        );
        Ok(updated)
    }

    // ========================================================================
    // Installments
    // ========================================================================

    /// Regenerate the installment plan with a new count. Refused as soon as
    /// any payment exists — reversing payments first is the explicit path.
    pub async fn update_installment_plan(
        &self,
        order_id: &str,
        count: u32,
        actor: &str,
    ) -> LedgerResult<Order> {
        let order = self.fetch(order_id).await?;
        if order.payment_method != PaymentMethod::Crediario {
            return Err(LedgerError::InvalidState(format!(
                "order {} is not a Crediário order",
                order_id
            )));
        }
        self.check_installment_cap(&order, count).await?;

        let updated = self
            .mutate(order_id, |order| {
                if order.has_payments() {
                    return Err(LedgerError::InvalidState(format!(
                        "order {} already has recorded payments; reverse them before changing the plan",
                        order_id
                    )));
                }
                order.installment_details =
                    installment::generate_plan(order.total, count, order.created_date())?;
                Ok(())
            })
            .await?;
        self.audit.record(
            AuditAction::InstallmentPlanRegenerated,
            format!("order {} plan regenerated with {} installments", order_id, count),
            actor,
        );
        Ok(updated)
    }

    /// Record a payment against one installment.
    pub async fn record_payment(
        &self,
        order_id: &str,
        number: u32,
        input: PaymentInput,
        actor: &str,
    ) -> LedgerResult<(Order, Payment)> {
        let mut recorded: Option<Payment> = None;
        let updated = self
            .mutate(order_id, |order| {
                let target = order.installment_mut(number).ok_or(
                    LedgerError::InstallmentNotFound {
                        order_id: order_id.to_string(),
                        number,
                    },
                )?;
                recorded = Some(installment::record_payment(target, &input)?);
                Ok(())
            })
            .await?;

        // `mutate` only returns Ok after the closure ran successfully
        let payment = recorded.ok_or_else(|| {
            LedgerError::InvalidState("payment was not recorded".to_string())
        })?;
        self.audit.record(
            AuditAction::InstallmentPaymentAdded,
            format!(
                "order {} installment {} received {:.2}",
                order_id, number, payment.amount
            ),
            actor,
        );
        if let Some(i) = updated.installment(number)
            && i.status == InstallmentStatus::Pago
        {
            self.notifier.notify(
                Severity::Info,
                &format!("Order {} installment {} settled", order_id, number),
            );
        }
        Ok((updated, payment))
    }

    /// Reverse a payment by id, recomputing the installment's derived
    /// fields from what remains.
    pub async fn reverse_payment(
        &self,
        order_id: &str,
        number: u32,
        payment_id: &str,
        actor: &str,
    ) -> LedgerResult<Order> {
        let updated = self
            .mutate(order_id, |order| {
                let target = order.installment_mut(number).ok_or(
                    LedgerError::InstallmentNotFound {
                        order_id: order_id.to_string(),
                        number,
                    },
                )?;
                installment::reverse_payment(target, payment_id)?;
                Ok(())
            })
            .await?;
        self.audit.record(
            AuditAction::InstallmentPaymentReversed,
            format!(
                "order {} installment {} payment {} reversed",
                order_id, number, payment_id
            ),
            actor,
        );
        Ok(updated)
    }

    /// Push an installment's due date. Amount and number stay fixed.
    pub async fn update_due_date(
        &self,
        order_id: &str,
        number: u32,
        due_date: NaiveDate,
        actor: &str,
    ) -> LedgerResult<Order> {
        let updated = self
            .mutate(order_id, |order| {
                let target = order.installment_mut(number).ok_or(
                    LedgerError::InstallmentNotFound {
                        order_id: order_id.to_string(),
                        number,
                    },
                )?;
                target.due_date = due_date;
                Ok(())
            })
            .await?;
        self.audit.record(
            AuditAction::DueDateChanged,
            format!("order {} installment {} due date moved to {}", order_id, number, due_date),
            actor,
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NullAuditSink;
    use crate::notify::NullNotifier;
    use crate::store::MemoryStore;
    use shared::models::{CommissionRule, CommissionRuleType, OrderItemInput, ProductCreate};

    struct Fixture {
        ledger: OrderLedger,
        products: ProductRepository,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let products = ProductRepository::new(store.clone());
        let orders = OrderRepository::new(store.clone());
        let stock = StockLedger::new(store.clone(), products.clone());
        let ledger = OrderLedger::new(
            store,
            orders,
            products.clone(),
            stock,
            Arc::new(NullAuditSink),
            Arc::new(NullNotifier),
        );
        Fixture { ledger, products }
    }

    async fn seed_product(fx: &Fixture, stock: i64, rule: Option<CommissionRule>) -> String {
        fx.products
            .create(ProductCreate {
                name: "Tênis".to_string(),
                price: 100.0,
                stock,
                commission_rule: rule,
                max_installments: Some(12),
            })
            .await
            .unwrap()
            .id
            .unwrap()
    }

    fn draft(product_id: &str, quantity: i64) -> OrderDraft {
        OrderDraft {
            customer_id: None,
            customer_name: "Maria".to_string(),
            items: vec![OrderItemInput {
                product_id: product_id.to_string(),
                quantity,
            }],
            payment_method: PaymentMethod::Pix,
            seller_id: Some("s1".to_string()),
            seller_name: Some("João".to_string()),
            installment_count: None,
        }
    }

    fn crediario_draft(product_id: &str, quantity: i64, count: u32) -> OrderDraft {
        OrderDraft {
            payment_method: PaymentMethod::Crediario,
            installment_count: Some(count),
            ..draft(product_id, quantity)
        }
    }

    fn percentage_rule(value: f64) -> Option<CommissionRule> {
        Some(CommissionRule {
            rule_type: CommissionRuleType::Percentage,
            value,
        })
    }

    async fn stock_of(fx: &Fixture, id: &str) -> i64 {
        fx.products.find_by_id(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn create_snapshots_prices_and_reserves_stock() {
        let fx = fixture();
        let pid = seed_product(&fx, 10, None).await;

        let order = fx.ledger.create(draft(&pid, 3), "op").await.unwrap();
        assert_eq!(order.total, 300.0);
        assert_eq!(order.status, OrderStatus::Processando);
        assert_eq!(order.items[0].price, 100.0);
        assert_eq!(stock_of(&fx, &pid).await, 7);

        // Later price change must not retroactively alter the order
        fx.products
            .update(
                &pid,
                shared::models::ProductUpdate {
                    name: None,
                    price: Some(150.0),
                    commission_rule: None,
                    max_installments: None,
                    is_active: None,
                },
            )
            .await
            .unwrap();
        let reread = fx
            .ledger
            .fetch(order.id.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(reread.total, 300.0);
        assert_eq!(reread.items[0].price, 100.0);
    }

    #[tokio::test]
    async fn create_with_insufficient_stock_writes_nothing() {
        let fx = fixture();
        let pid = seed_product(&fx, 2, None).await;

        let err = fx.ledger.create(draft(&pid, 3), "op").await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { .. }));
        assert_eq!(stock_of(&fx, &pid).await, 2);
        assert!(fx.ledger.orders.find_everything().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn crediario_order_gets_a_plan_and_respects_the_cap() {
        let fx = fixture();
        let pid = seed_product(&fx, 10, None).await;

        let order = fx
            .ledger
            .create(crediario_draft(&pid, 3, 3), "op")
            .await
            .unwrap();
        assert_eq!(order.installment_details.len(), 3);
        assert_eq!(order.installment_details[0].amount, 100.0);

        let err = fx
            .ledger
            .create(crediario_draft(&pid, 1, 24), "op")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn cancel_releases_stock_and_reactivation_reserves_again() {
        let fx = fixture();
        let pid = seed_product(&fx, 5, None).await;
        let order = fx.ledger.create(draft(&pid, 5), "op").await.unwrap();
        let oid = order.id.clone().unwrap();
        assert_eq!(stock_of(&fx, &pid).await, 0);

        fx.ledger
            .transition(&oid, OrderStatus::Cancelado, "op")
            .await
            .unwrap();
        assert_eq!(stock_of(&fx, &pid).await, 5);

        fx.ledger
            .transition(&oid, OrderStatus::Processando, "op")
            .await
            .unwrap();
        assert_eq!(stock_of(&fx, &pid).await, 0);
    }

    #[tokio::test]
    async fn reactivation_fails_atomically_when_goods_were_sold_meanwhile() {
        let fx = fixture();
        let pid = seed_product(&fx, 5, None).await;
        let order = fx.ledger.create(draft(&pid, 4), "op").await.unwrap();
        let oid = order.id.clone().unwrap();

        fx.ledger
            .transition(&oid, OrderStatus::Cancelado, "op")
            .await
            .unwrap();
        // Someone else buys 3 of the 5 returned units
        fx.ledger.create(draft(&pid, 3), "op").await.unwrap();
        assert_eq!(stock_of(&fx, &pid).await, 2);

        let err = fx
            .ledger
            .transition(&oid, OrderStatus::Processando, "op")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientStock {
                available: 2,
                requested: 4,
                ..
            }
        ));
        // The order stays cancelled and stock is untouched
        let unchanged = fx.ledger.fetch(&oid).await.unwrap();
        assert_eq!(unchanged.status, OrderStatus::Cancelado);
        assert_eq!(stock_of(&fx, &pid).await, 2);
    }

    #[tokio::test]
    async fn intra_set_transition_leaves_stock_alone() {
        let fx = fixture();
        let pid = seed_product(&fx, 5, None).await;
        let order = fx.ledger.create(draft(&pid, 2), "op").await.unwrap();
        let oid = order.id.clone().unwrap();

        fx.ledger
            .transition(&oid, OrderStatus::Enviado, "op")
            .await
            .unwrap();
        assert_eq!(stock_of(&fx, &pid).await, 3);
    }

    #[tokio::test]
    async fn delivery_earns_commission_and_leaving_zeroes_it() {
        let fx = fixture();
        let pid = seed_product(&fx, 10, percentage_rule(10.0)).await;
        let order = fx.ledger.create(draft(&pid, 2), "op").await.unwrap();
        let oid = order.id.clone().unwrap();
        assert_eq!(order.commission, 0.0);

        let delivered = fx
            .ledger
            .transition(&oid, OrderStatus::Entregue, "op")
            .await
            .unwrap();
        // 2 × 100 at 10%
        assert_eq!(delivered.commission, 20.0);

        let cancelled = fx
            .ledger
            .transition(&oid, OrderStatus::Cancelado, "op")
            .await
            .unwrap();
        assert_eq!(cancelled.commission, 0.0);
        assert!(!cancelled.commission_paid);
    }

    #[tokio::test]
    async fn manual_pin_survives_every_transition_until_cleared() {
        let fx = fixture();
        let pid = seed_product(&fx, 10, percentage_rule(10.0)).await;
        let order = fx.ledger.create(draft(&pid, 2), "op").await.unwrap();
        let oid = order.id.clone().unwrap();

        fx.ledger.set_manual_commission(&oid, 60.0, "op").await.unwrap();

        let cancelled = fx
            .ledger
            .transition(&oid, OrderStatus::Cancelado, "op")
            .await
            .unwrap();
        assert_eq!(cancelled.commission, 60.0);

        let delivered = fx
            .ledger
            .transition(&oid, OrderStatus::Entregue, "op")
            .await
            .unwrap();
        assert_eq!(delivered.commission, 60.0);
        assert!(delivered.is_commission_manual);

        // Clearing while delivered falls back to the rules
        let cleared = fx.ledger.clear_manual_commission(&oid, "op").await.unwrap();
        assert!(!cleared.is_commission_manual);
        assert_eq!(cleared.commission, 20.0);
    }

    #[tokio::test]
    async fn soft_delete_releases_stock_and_restore_reclaims_it() {
        let fx = fixture();
        let pid = seed_product(&fx, 5, None).await;
        let order = fx.ledger.create(draft(&pid, 3), "op").await.unwrap();
        let oid = order.id.clone().unwrap();

        let deleted = fx.ledger.soft_delete(&oid, "op").await.unwrap();
        assert_eq!(deleted.status, OrderStatus::Excluido);
        assert_eq!(stock_of(&fx, &pid).await, 5);
        // Hidden from the default listing, still present in the trash view
        assert!(fx.ledger.orders.find_all().await.unwrap().is_empty());
        assert_eq!(fx.ledger.orders.find_everything().await.unwrap().len(), 1);

        let restored = fx.ledger.restore(&oid, "op").await.unwrap();
        assert_eq!(restored.status, OrderStatus::Processando);
        assert_eq!(stock_of(&fx, &pid).await, 2);
    }

    #[tokio::test]
    async fn permanent_delete_only_from_trash() {
        let fx = fixture();
        let pid = seed_product(&fx, 5, None).await;
        let order = fx.ledger.create(draft(&pid, 1), "op").await.unwrap();
        let oid = order.id.clone().unwrap();

        let err = fx.ledger.permanently_delete(&oid, "op").await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));

        fx.ledger.soft_delete(&oid, "op").await.unwrap();
        fx.ledger.permanently_delete(&oid, "op").await.unwrap();
        assert!(fx.ledger.orders.find_by_id(&oid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn payments_persist_and_reversal_restores_pendente() {
        let fx = fixture();
        let pid = seed_product(&fx, 10, None).await;
        let order = fx
            .ledger
            .create(crediario_draft(&pid, 3, 3), "op")
            .await
            .unwrap();
        let oid = order.id.clone().unwrap();

        let (after, payment) = fx
            .ledger
            .record_payment(
                &oid,
                1,
                PaymentInput {
                    amount: 100.0,
                    method: PaymentMethod::Pix,
                    date: None,
                    tendered: None,
                },
                "op",
            )
            .await
            .unwrap();
        assert_eq!(after.installment(1).unwrap().status, InstallmentStatus::Pago);

        let reversed = fx
            .ledger
            .reverse_payment(&oid, 1, &payment.id, "op")
            .await
            .unwrap();
        let first = reversed.installment(1).unwrap();
        assert_eq!(first.status, InstallmentStatus::Pendente);
        assert_eq!(first.paid_amount, 0.0);

        let err = fx
            .ledger
            .reverse_payment(&oid, 1, &payment.id, "op")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::PaymentNotFound(_)));
    }

    #[tokio::test]
    async fn plan_regeneration_is_blocked_once_payments_exist() {
        let fx = fixture();
        let pid = seed_product(&fx, 10, None).await;
        let order = fx
            .ledger
            .create(crediario_draft(&pid, 3, 3), "op")
            .await
            .unwrap();
        let oid = order.id.clone().unwrap();

        // Without payments the plan can change freely
        let replanned = fx
            .ledger
            .update_installment_plan(&oid, 6, "op")
            .await
            .unwrap();
        assert_eq!(replanned.installment_details.len(), 6);

        fx.ledger
            .record_payment(
                &oid,
                1,
                PaymentInput {
                    amount: 10.0,
                    method: PaymentMethod::Dinheiro,
                    date: None,
                    tendered: None,
                },
                "op",
            )
            .await
            .unwrap();

        let err = fx
            .ledger
            .update_installment_plan(&oid, 3, "op")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));
        // The existing plan and its payment are untouched
        let unchanged = fx.ledger.fetch(&oid).await.unwrap();
        assert_eq!(unchanged.installment_details.len(), 6);
        assert_eq!(unchanged.installment(1).unwrap().paid_amount, 10.0);
    }

    #[tokio::test]
    async fn due_date_moves_without_touching_amounts() {
        let fx = fixture();
        let pid = seed_product(&fx, 10, None).await;
        let order = fx
            .ledger
            .create(crediario_draft(&pid, 3, 3), "op")
            .await
            .unwrap();
        let oid = order.id.clone().unwrap();
        let new_date = NaiveDate::from_ymd_opt(2030, 12, 25).unwrap();

        let updated = fx
            .ledger
            .update_due_date(&oid, 2, new_date, "op")
            .await
            .unwrap();
        let second = updated.installment(2).unwrap();
        assert_eq!(second.due_date, new_date);
        assert_eq!(second.amount, 100.0);

        let err = fx
            .ledger
            .update_due_date(&oid, 9, new_date, "op")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InstallmentNotFound { number: 9, .. }));
    }

    #[tokio::test]
    async fn reassigning_seller_recomputes_automatic_commission() {
        let fx = fixture();
        let pid = seed_product(&fx, 10, percentage_rule(10.0)).await;
        let order = fx.ledger.create(draft(&pid, 1), "op").await.unwrap();
        let oid = order.id.clone().unwrap();
        fx.ledger
            .transition(&oid, OrderStatus::Entregue, "op")
            .await
            .unwrap();

        let updated = fx
            .ledger
            .reassign_seller(&oid, Some("s2".into()), Some("Ana".into()), "op")
            .await
            .unwrap();
        assert_eq!(updated.seller_name.as_deref(), Some("Ana"));
        assert_eq!(updated.commission, 10.0);
    }
}
