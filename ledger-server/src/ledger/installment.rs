//! Installment Account
//!
//! Per-order installment plan and per-installment payment sub-ledger.
//! `paid_amount` and `status` are always recomputed from the full payment
//! list — never adjusted by delta — so a reversal cannot drift the total.

use super::error::{LedgerError, LedgerResult};
use super::money;
use chrono::{Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::models::{Installment, InstallmentStatus, Payment, PaymentInput, PaymentMethod};

/// Split `total` into `count` equal installments due monthly after `anchor`.
///
/// Every installment gets `round2(total / count)`; the rounding remainder is
/// deliberately not corrected on the last installment (the plan sum stays
/// within 0.01 of the total, which is what the ledger invariant requires).
///
/// This produces a fresh plan with no payment history — callers owning an
/// order with recorded payments must guard before regenerating.
pub fn generate_plan(total: f64, count: u32, anchor: NaiveDate) -> LedgerResult<Vec<Installment>> {
    if count == 0 {
        return Err(LedgerError::Validation(
            "installment count must be at least 1".to_string(),
        ));
    }
    if !total.is_finite() || total < 0.0 {
        return Err(LedgerError::Validation(format!(
            "order total must be non-negative, got {}",
            total
        )));
    }

    let amount = money::to_f64(money::to_decimal(total) / Decimal::from(count));

    (1..=count)
        .map(|number| {
            let due_date = anchor
                .checked_add_months(Months::new(number))
                .ok_or_else(|| {
                    LedgerError::Validation(format!("due date overflow at installment {}", number))
                })?;
            Ok(Installment {
                installment_number: number,
                amount,
                due_date,
                status: InstallmentStatus::Pendente,
                paid_amount: 0.0,
                payments: Vec::new(),
            })
        })
        .collect()
}

/// Recompute the derived fields from the payment list.
///
/// `Pago` iff the paid total matches the installment amount within 0.01.
/// An overpaid installment therefore reads `Pendente` again; overpayment is
/// allowed (spilling past the amount for non-cash methods) but never hides
/// the mismatch.
pub fn recompute(installment: &mut Installment) {
    installment.paid_amount = money::sum_payments(&installment.payments);
    installment.status = if money::money_eq(installment.paid_amount, installment.amount) {
        InstallmentStatus::Pago
    } else {
        InstallmentStatus::Pendente
    };
}

/// Append a payment and recompute the sub-ledger.
///
/// Overpayment is never rejected: for cash the excess over `tendered`
/// becomes informational change, for other methods `paid_amount` simply
/// inflates past `amount`.
pub fn record_payment(
    installment: &mut Installment,
    input: &PaymentInput,
) -> LedgerResult<Payment> {
    money::validate_payment(input)?;

    // Cash change: tendered minus amount, floored at zero
    let change = match (input.method, input.tendered) {
        (PaymentMethod::Dinheiro, Some(tendered)) => {
            let diff = money::to_decimal(tendered) - money::to_decimal(input.amount);
            Some(money::to_f64(diff.max(Decimal::ZERO)))
        }
        _ => None,
    };

    let payment = Payment {
        id: uuid::Uuid::new_v4().to_string(),
        amount: input.amount,
        date: input.date.unwrap_or_else(|| Utc::now().date_naive()),
        method: input.method,
        change,
    };
    installment.payments.push(payment.clone());
    recompute(installment);
    Ok(payment)
}

/// Remove a payment by id and recompute from the remaining list.
pub fn reverse_payment(installment: &mut Installment, payment_id: &str) -> LedgerResult<Payment> {
    let index = installment
        .payments
        .iter()
        .position(|p| p.id == payment_id)
        .ok_or_else(|| LedgerError::PaymentNotFound(payment_id.to_string()))?;
    let removed = installment.payments.remove(index);
    recompute(installment);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::PaymentMethod;

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn pix(amount: f64) -> PaymentInput {
        PaymentInput {
            amount,
            method: PaymentMethod::Pix,
            date: None,
            tendered: None,
        }
    }

    #[test]
    fn plan_of_300_in_3_gives_three_hundreds() {
        let plan = generate_plan(300.0, 3, anchor()).unwrap();
        let amounts: Vec<f64> = plan.iter().map(|i| i.amount).collect();
        assert_eq!(amounts, vec![100.0, 100.0, 100.0]);
        assert_eq!(
            plan.iter().map(|i| i.installment_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn plan_due_dates_step_monthly_from_anchor() {
        let plan = generate_plan(300.0, 3, anchor()).unwrap();
        assert_eq!(plan[0].due_date, NaiveDate::from_ymd_opt(2024, 2, 15).unwrap());
        assert_eq!(plan[1].due_date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(plan[2].due_date, NaiveDate::from_ymd_opt(2024, 4, 15).unwrap());
    }

    #[test]
    fn plan_sum_stays_within_tolerance_of_total() {
        // 100 / 3 => 33.33 each, sum 99.99
        let plan = generate_plan(100.0, 3, anchor()).unwrap();
        let sum = money::to_f64(plan.iter().map(|i| money::to_decimal(i.amount)).sum());
        assert!((sum - 100.0).abs() < 0.01, "sum was {}", sum);
        assert_eq!(plan[0].amount, 33.33);
    }

    #[test]
    fn plan_rejects_zero_count() {
        assert!(matches!(
            generate_plan(100.0, 0, anchor()),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn partial_then_completing_payment_flips_status() {
        let mut installment = generate_plan(300.0, 3, anchor()).unwrap().remove(0);

        record_payment(
            &mut installment,
            &PaymentInput {
                amount: 60.0,
                method: PaymentMethod::Dinheiro,
                date: None,
                tendered: None,
            },
        )
        .unwrap();
        assert_eq!(installment.paid_amount, 60.0);
        assert_eq!(installment.status, InstallmentStatus::Pendente);

        record_payment(&mut installment, &pix(40.0)).unwrap();
        assert_eq!(installment.paid_amount, 100.0);
        assert_eq!(installment.status, InstallmentStatus::Pago);
    }

    #[test]
    fn overpayment_inflates_paid_amount_and_leaves_status_pendente() {
        let mut installment = generate_plan(100.0, 1, anchor()).unwrap().remove(0);

        record_payment(&mut installment, &pix(120.0)).unwrap();
        // Overpayment is accepted as-is; the status biconditional keeps the
        // mismatch visible instead of reading as settled.
        assert_eq!(installment.paid_amount, 120.0);
        assert_eq!(installment.status, InstallmentStatus::Pendente);
    }

    #[test]
    fn cash_excess_becomes_change_not_paid_amount() {
        let mut installment = generate_plan(100.0, 1, anchor()).unwrap().remove(0);

        let payment = record_payment(
            &mut installment,
            &PaymentInput {
                amount: 100.0,
                method: PaymentMethod::Dinheiro,
                date: None,
                tendered: Some(150.0),
            },
        )
        .unwrap();
        assert_eq!(payment.change, Some(50.0));
        assert_eq!(installment.paid_amount, 100.0);
        assert_eq!(installment.status, InstallmentStatus::Pago);
    }

    #[test]
    fn reversal_recomputes_and_second_reversal_fails() {
        let mut installment = generate_plan(100.0, 1, anchor()).unwrap().remove(0);
        let p1 = record_payment(&mut installment, &pix(60.0)).unwrap();
        record_payment(&mut installment, &pix(40.0)).unwrap();
        assert_eq!(installment.status, InstallmentStatus::Pago);

        reverse_payment(&mut installment, &p1.id).unwrap();
        assert_eq!(installment.paid_amount, 40.0);
        assert_eq!(installment.status, InstallmentStatus::Pendente);

        // Idempotence: same id again is PaymentNotFound, total unchanged
        let err = reverse_payment(&mut installment, &p1.id).unwrap_err();
        assert!(matches!(err, LedgerError::PaymentNotFound(_)));
        assert_eq!(installment.paid_amount, 40.0);
    }

    #[test]
    fn paid_amount_is_exact_sum_after_many_operations() {
        let mut installment = generate_plan(10.0, 1, anchor()).unwrap().remove(0);
        let mut ids = Vec::new();
        for _ in 0..10 {
            ids.push(record_payment(&mut installment, &pix(0.1)).unwrap().id);
        }
        assert_eq!(installment.paid_amount, 1.0);

        for id in ids.iter().take(3) {
            reverse_payment(&mut installment, id).unwrap();
        }
        assert_eq!(installment.paid_amount, 0.7);
    }
}
