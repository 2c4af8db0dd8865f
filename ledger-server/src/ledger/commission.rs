//! Commission Engine
//!
//! Pure rule evaluation over an order's line items against the product
//! catalog. Earning semantics (compute on Entregue, zero elsewhere, manual
//! pin) live in the order ledger; this module only answers "what would the
//! commission be for these items under the current rules".

use super::money;
use rust_decimal::Decimal;
use shared::models::{CommissionRuleType, Order, Product};
use std::collections::HashMap;

/// Compute the automatic commission for an order against the catalog.
///
/// Manually pinned orders return their stored commission untouched; rule
/// changes never affect them. Items whose product vanished or carries no
/// rule contribute zero.
pub fn compute(order: &Order, catalog: &HashMap<String, Product>) -> f64 {
    if order.is_commission_manual {
        return order.commission;
    }

    let total: Decimal = order
        .items
        .iter()
        .map(|item| {
            let Some(rule) = catalog
                .get(&item.product_id)
                .and_then(|p| p.commission_rule.as_ref())
            else {
                return Decimal::ZERO;
            };
            let quantity = Decimal::from(item.quantity);
            let value = money::to_decimal(rule.value);
            match rule.rule_type {
                CommissionRuleType::Fixed => value * quantity,
                CommissionRuleType::Percentage => {
                    money::to_decimal(item.price) * quantity * value / Decimal::from(100)
                }
            }
        })
        .sum();

    money::to_f64(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{
        CommissionRule, OrderItem, OrderStatus, PaymentMethod,
    };

    fn product(id: &str, rule: Option<CommissionRule>) -> Product {
        Product {
            id: Some(id.to_string()),
            name: format!("Produto {}", id),
            price: 50.0,
            stock: 10,
            commission_rule: rule,
            max_installments: None,
            is_active: true,
            created_at: 0,
            version: 1,
        }
    }

    fn order(items: Vec<OrderItem>) -> Order {
        Order {
            id: Some("o1".to_string()),
            customer_id: None,
            customer_name: "Maria".to_string(),
            items,
            total: 0.0,
            status: OrderStatus::Entregue,
            payment_method: PaymentMethod::Pix,
            seller_id: Some("s1".to_string()),
            seller_name: Some("João".to_string()),
            commission: 0.0,
            is_commission_manual: false,
            commission_paid: false,
            installment_details: Vec::new(),
            created_at: 0,
            version: 1,
        }
    }

    fn item(product_id: &str, quantity: i64, price: f64) -> OrderItem {
        OrderItem {
            product_id: product_id.to_string(),
            name: "Item".to_string(),
            quantity,
            price,
        }
    }

    #[test]
    fn fixed_rule_pays_per_unit() {
        let catalog = HashMap::from([(
            "p1".to_string(),
            product(
                "p1",
                Some(CommissionRule {
                    rule_type: CommissionRuleType::Fixed,
                    value: 5.0,
                }),
            ),
        )]);
        let order = order(vec![item("p1", 3, 40.0)]);
        assert_eq!(compute(&order, &catalog), 15.0);
    }

    #[test]
    fn percentage_rule_applies_to_line_total() {
        let catalog = HashMap::from([(
            "p1".to_string(),
            product(
                "p1",
                Some(CommissionRule {
                    rule_type: CommissionRuleType::Percentage,
                    value: 10.0,
                }),
            ),
        )]);
        // 2 × 49.90 = 99.80, 10% => 9.98
        let order = order(vec![item("p1", 2, 49.90)]);
        assert_eq!(compute(&order, &catalog), 9.98);
    }

    #[test]
    fn mixed_rules_sum_and_ruleless_items_contribute_zero() {
        let catalog = HashMap::from([
            (
                "p1".to_string(),
                product(
                    "p1",
                    Some(CommissionRule {
                        rule_type: CommissionRuleType::Fixed,
                        value: 2.5,
                    }),
                ),
            ),
            ("p2".to_string(), product("p2", None)),
        ]);
        let order = order(vec![
            item("p1", 2, 30.0),
            item("p2", 5, 10.0),
            // vanished product
            item("p3", 1, 99.0),
        ]);
        assert_eq!(compute(&order, &catalog), 5.0);
    }

    #[test]
    fn manual_pin_ignores_catalog_rules() {
        let catalog = HashMap::from([(
            "p1".to_string(),
            product(
                "p1",
                Some(CommissionRule {
                    rule_type: CommissionRuleType::Fixed,
                    value: 5.0,
                }),
            ),
        )]);
        let mut order = order(vec![item("p1", 10, 40.0)]);
        order.is_commission_manual = true;
        order.commission = 60.0;
        assert_eq!(compute(&order, &catalog), 60.0);
    }
}
