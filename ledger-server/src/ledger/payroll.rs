//! Commission Payroll
//!
//! Batch settlement of earned commissions: one payment record covers a set
//! of delivered orders, flipping their `commissionPaid` markers in the same
//! atomic batch that inserts the record. Reversal deletes the record and
//! unflips the markers, tolerating orders that were purged in between.

use super::error::{LedgerError, LedgerResult};
use super::money;
use crate::audit::{AuditAction, AuditSink};
use crate::db::{CommissionPaymentRepository, OrderRepository};
use crate::notify::{NotificationSink, Severity};
use crate::store::{DocumentStore, WriteOp};
use shared::models::{CommissionPayment, Order, OrderStatus};
use shared::util;
use std::sync::Arc;

fn commission_paid_fields(paid: bool) -> serde_json::Map<String, serde_json::Value> {
    let mut fields = serde_json::Map::new();
    fields.insert("commissionPaid".to_string(), serde_json::json!(paid));
    fields
}

#[derive(Clone)]
pub struct CommissionPayroll {
    store: Arc<dyn DocumentStore>,
    orders: OrderRepository,
    payments: CommissionPaymentRepository,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn NotificationSink>,
}

impl CommissionPayroll {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        orders: OrderRepository,
        payments: CommissionPaymentRepository,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            orders,
            payments,
            audit,
            notifier,
        }
    }

    /// Orders whose commission is earned but not yet settled, optionally
    /// narrowed to one seller. Only delivered orders can owe commission.
    pub async fn commission_due(&self, seller_id: Option<&str>) -> LedgerResult<Vec<Order>> {
        let delivered = self.orders.find_by_status(OrderStatus::Entregue).await?;
        Ok(delivered
            .into_iter()
            .filter(|o| !o.commission_paid && o.commission > 0.0)
            .filter(|o| match seller_id {
                Some(id) => o.seller_id.as_deref() == Some(id),
                None => true,
            })
            .collect())
    }

    /// Settle the commission for a batch of orders.
    ///
    /// Every order must exist, be delivered and still unpaid; the payment
    /// record and all `commissionPaid` flips commit together, so a conflict
    /// on any one order voids the whole settlement.
    pub async fn pay(
        &self,
        seller_id: &str,
        amount: f64,
        order_ids: Vec<String>,
        period: String,
        actor: &str,
    ) -> LedgerResult<CommissionPayment> {
        if order_ids.is_empty() {
            return Err(LedgerError::Validation(
                "a commission payment must cover at least one order".to_string(),
            ));
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(LedgerError::Validation(
                "commission payment amount must be positive".to_string(),
            ));
        }

        let mut writes: Vec<WriteOp> = Vec::with_capacity(order_ids.len() + 1);
        let mut expected = rust_decimal::Decimal::ZERO;
        for order_id in &order_ids {
            let order = self
                .orders
                .find_by_id(order_id)
                .await?
                .ok_or_else(|| LedgerError::OrderNotFound(order_id.clone()))?;
            if order.status != OrderStatus::Entregue {
                return Err(LedgerError::InvalidState(format!(
                    "order {} is not delivered, its commission is not earned",
                    order_id
                )));
            }
            if order.commission_paid {
                return Err(LedgerError::InvalidState(format!(
                    "order {} commission is already settled",
                    order_id
                )));
            }
            if order.seller_id.as_deref() != Some(seller_id) {
                return Err(LedgerError::Validation(format!(
                    "order {} does not belong to seller {}",
                    order_id, seller_id
                )));
            }
            expected += money::to_decimal(order.commission);
            writes.push(WriteOp::update_cas(
                OrderRepository::path(order_id),
                commission_paid_fields(true),
                order.version,
            ));
        }

        if !money::money_eq(amount, money::to_f64(expected)) {
            return Err(LedgerError::Validation(format!(
                "payment amount {:.2} does not match the commission due {:.2}",
                amount,
                money::to_f64(expected)
            )));
        }

        let payment = CommissionPayment {
            id: Some(util::snowflake_id().to_string()),
            seller_id: seller_id.to_string(),
            amount,
            period,
            order_ids,
            payment_date: util::now_millis(),
            version: 0,
        };
        writes.push(self.payments.insert_op(&payment)?);
        self.store.atomic_batch(writes).await?;

        let id = payment.id.as_deref().unwrap_or_default();
        self.audit.record(
            AuditAction::CommissionPaid,
            format!(
                "commission payment {} of {:.2} to seller {} over {} orders",
                id,
                amount,
                seller_id,
                payment.order_ids.len()
            ),
            actor,
        );
        self.notifier.notify(
            Severity::Info,
            &format!("Commission of {:.2} paid to seller {}", amount, seller_id),
        );
        Ok(CommissionPayment {
            version: 1,
            ..payment
        })
    }

    /// Undo a settlement: delete the record and mark its orders unpaid
    /// again. Orders that no longer exist are skipped with a warning — the
    /// record is the source of truth for what was covered, not a lock on
    /// the orders' lifetime.
    pub async fn reverse(&self, payment_id: &str, actor: &str) -> LedgerResult<()> {
        let payment = self
            .payments
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| LedgerError::PaymentNotFound(payment_id.to_string()))?;

        let mut writes: Vec<WriteOp> = vec![self.payments.delete_op(&payment)?];
        for order_id in &payment.order_ids {
            match self.orders.find_by_id(order_id).await? {
                Some(order) => writes.push(WriteOp::update_cas(
                    OrderRepository::path(order_id),
                    commission_paid_fields(false),
                    order.version,
                )),
                None => {
                    tracing::warn!(
                        order_id = %order_id,
                        payment_id = %payment_id,
                        "order covered by reversed commission payment no longer exists"
                    );
                }
            }
        }
        self.store.atomic_batch(writes).await?;

        self.audit.record(
            AuditAction::CommissionPaymentReversed,
            format!(
                "commission payment {} to seller {} reversed",
                payment_id, payment.seller_id
            ),
            actor,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NullAuditSink;
    use crate::db::ProductRepository;
    use crate::ledger::orders::OrderLedger;
    use crate::ledger::stock::StockLedger;
    use crate::notify::NullNotifier;
    use crate::store::MemoryStore;
    use shared::models::{
        CommissionRule, CommissionRuleType, OrderDraft, OrderItemInput, PaymentMethod,
        ProductCreate,
    };

    struct Fixture {
        ledger: OrderLedger,
        payroll: CommissionPayroll,
        orders: OrderRepository,
        product_id: String,
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let products = ProductRepository::new(store.clone());
        let orders = OrderRepository::new(store.clone());
        let payments = CommissionPaymentRepository::new(store.clone());
        let stock = StockLedger::new(store.clone(), products.clone());
        let audit: Arc<dyn AuditSink> = Arc::new(NullAuditSink);
        let notifier: Arc<dyn crate::notify::NotificationSink> = Arc::new(NullNotifier);
        let ledger = OrderLedger::new(
            store.clone(),
            orders.clone(),
            products.clone(),
            stock,
            audit.clone(),
            notifier.clone(),
        );
        let payroll =
            CommissionPayroll::new(store, orders.clone(), payments, audit, notifier);

        let product_id = products
            .create(ProductCreate {
                name: "Tênis".to_string(),
                price: 100.0,
                stock: 100,
                commission_rule: Some(CommissionRule {
                    rule_type: CommissionRuleType::Percentage,
                    value: 10.0,
                }),
                max_installments: None,
            })
            .await
            .unwrap()
            .id
            .unwrap();

        Fixture {
            ledger,
            payroll,
            orders,
            product_id,
        }
    }

    async fn delivered_order(fx: &Fixture, quantity: i64) -> String {
        let order = fx
            .ledger
            .create(
                OrderDraft {
                    customer_id: None,
                    customer_name: "Maria".to_string(),
                    items: vec![OrderItemInput {
                        product_id: fx.product_id.clone(),
                        quantity,
                    }],
                    payment_method: PaymentMethod::Pix,
                    seller_id: Some("s1".to_string()),
                    seller_name: Some("João".to_string()),
                    installment_count: None,
                },
                "op",
            )
            .await
            .unwrap();
        let oid = order.id.clone().unwrap();
        fx.ledger
            .transition(&oid, OrderStatus::Entregue, "op")
            .await
            .unwrap();
        oid
    }

    #[tokio::test]
    async fn pay_marks_orders_settled_and_reverse_unmarks_them() {
        let fx = fixture().await;
        let a = delivered_order(&fx, 1).await; // commission 10
        let b = delivered_order(&fx, 2).await; // commission 20

        let due = fx.payroll.commission_due(Some("s1")).await.unwrap();
        assert_eq!(due.len(), 2);

        let payment = fx
            .payroll
            .pay("s1", 30.0, vec![a.clone(), b.clone()], "2026-08".to_string(), "op")
            .await
            .unwrap();
        assert!(fx.orders.find_by_id(&a).await.unwrap().unwrap().commission_paid);
        assert!(fx.orders.find_by_id(&b).await.unwrap().unwrap().commission_paid);
        assert!(fx.payroll.commission_due(Some("s1")).await.unwrap().is_empty());

        fx.payroll
            .reverse(payment.id.as_deref().unwrap(), "op")
            .await
            .unwrap();
        assert!(!fx.orders.find_by_id(&a).await.unwrap().unwrap().commission_paid);
        assert!(!fx.orders.find_by_id(&b).await.unwrap().unwrap().commission_paid);
    }

    #[tokio::test]
    async fn pay_rejects_amount_mismatch_and_double_settlement() {
        let fx = fixture().await;
        let a = delivered_order(&fx, 1).await;

        let err = fx
            .payroll
            .pay("s1", 99.0, vec![a.clone()], "2026-08".to_string(), "op")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        fx.payroll
            .pay("s1", 10.0, vec![a.clone()], "2026-08".to_string(), "op")
            .await
            .unwrap();
        let err = fx
            .payroll
            .pay("s1", 10.0, vec![a], "2026-08".to_string(), "op")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));
    }

    #[tokio::test]
    async fn pay_refuses_undelivered_and_foreign_orders() {
        let fx = fixture().await;
        let a = delivered_order(&fx, 1).await;
        fx.ledger
            .transition(&a, OrderStatus::Enviado, "op")
            .await
            .unwrap();

        let err = fx
            .payroll
            .pay("s1", 10.0, vec![a.clone()], "2026-08".to_string(), "op")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));

        fx.ledger
            .transition(&a, OrderStatus::Entregue, "op")
            .await
            .unwrap();
        let err = fx
            .payroll
            .pay("s2", 10.0, vec![a], "2026-08".to_string(), "op")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn reverse_skips_orders_that_were_purged() {
        let fx = fixture().await;
        let a = delivered_order(&fx, 1).await;
        let payment = fx
            .payroll
            .pay("s1", 10.0, vec![a.clone()], "2026-08".to_string(), "op")
            .await
            .unwrap();

        // Purge the order out from under the payment record
        fx.ledger.soft_delete(&a, "op").await.unwrap();
        fx.ledger.permanently_delete(&a, "op").await.unwrap();

        fx.payroll
            .reverse(payment.id.as_deref().unwrap(), "op")
            .await
            .unwrap();

        let err = fx
            .payroll
            .reverse(payment.id.as_deref().unwrap(), "op")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::PaymentNotFound(_)));
    }
}
