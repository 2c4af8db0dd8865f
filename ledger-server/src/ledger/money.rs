//! Money calculation utilities using rust_decimal for precision
//!
//! All calculations are done using `Decimal` internally, then converted to
//! `f64` for storage/serialization.

use super::error::LedgerError;
use rust_decimal::prelude::*;
use shared::models::{Payment, PaymentInput, PaymentMethod};

/// Rounding strategy for monetary values (2 decimal places, half-up)
pub const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed payment amount (R$1,000,000)
const MAX_PAYMENT_AMOUNT: f64 = 1_000_000.0;

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> Result<(), LedgerError> {
    if !value.is_finite() {
        return Err(LedgerError::Validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Validate a PaymentInput before processing
pub fn validate_payment(payment: &PaymentInput) -> Result<(), LedgerError> {
    require_finite(payment.amount, "payment amount")?;
    if payment.amount <= 0.0 {
        return Err(LedgerError::Validation(format!(
            "payment amount must be positive, got {}",
            payment.amount
        )));
    }
    if payment.amount > MAX_PAYMENT_AMOUNT {
        return Err(LedgerError::Validation(format!(
            "payment amount exceeds maximum allowed ({}), got {}",
            MAX_PAYMENT_AMOUNT, payment.amount
        )));
    }

    if let Some(t) = payment.tendered {
        require_finite(t, "tendered")?;
        if t < 0.0 {
            return Err(LedgerError::Validation(
                "tendered amount must be non-negative".to_string(),
            ));
        }
        if payment.method != PaymentMethod::Dinheiro {
            return Err(LedgerError::Validation(
                "tendered amount only applies to cash payments".to_string(),
            ));
        }
    }

    Ok(())
}

/// Convert f64 to Decimal for calculation
///
/// Input values should be pre-validated via `require_finite()` at the
/// boundary. If NaN/Infinity somehow reaches here, logs an error and
/// returns ZERO to avoid silent data corruption in financial calculations.
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(value = ?value, "Non-finite f64 in monetary calculation, defaulting to zero");
        Decimal::ZERO
    })
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        // SAFETY: Decimal rounded to 2dp with bounded inputs is always
        // within f64 representable range
        .expect("Decimal rounded to 2dp is always representable as f64")
}

/// Sum payment amounts with precise arithmetic
pub fn sum_payments(payments: &[Payment]) -> f64 {
    let total: Decimal = payments.iter().map(|p| to_decimal(p.amount)).sum();
    to_f64(total)
}

/// Compare two monetary values for equality (within 0.01 tolerance)
pub fn money_eq(a: f64, b: f64) -> bool {
    let diff = (to_decimal(a) - to_decimal(b)).abs();
    diff < MONEY_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn payment(amount: f64) -> Payment {
        Payment {
            id: "p1".to_string(),
            amount,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            method: PaymentMethod::Pix,
            change: None,
        }
    }

    #[test]
    fn sums_are_exact_where_f64_drifts() {
        // 0.1 + 0.2 famously != 0.3 in f64
        let payments = vec![payment(0.1), payment(0.2)];
        assert_eq!(sum_payments(&payments), 0.3);
    }

    #[test]
    fn money_eq_uses_cent_tolerance() {
        assert!(money_eq(100.0, 100.0));
        assert!(money_eq(100.0, 100.004));
        assert!(!money_eq(100.0, 100.01));
        assert!(!money_eq(100.0, 99.99));
    }

    #[test]
    fn rejects_non_positive_and_non_finite_amounts() {
        let mut input = PaymentInput {
            amount: 0.0,
            method: PaymentMethod::Pix,
            date: None,
            tendered: None,
        };
        assert!(validate_payment(&input).is_err());
        input.amount = -5.0;
        assert!(validate_payment(&input).is_err());
        input.amount = f64::NAN;
        assert!(validate_payment(&input).is_err());
        input.amount = 50.0;
        assert!(validate_payment(&input).is_ok());
    }

    #[test]
    fn tendered_only_valid_for_cash() {
        let input = PaymentInput {
            amount: 50.0,
            method: PaymentMethod::Pix,
            date: None,
            tendered: Some(60.0),
        };
        assert!(validate_payment(&input).is_err());

        let cash = PaymentInput {
            method: PaymentMethod::Dinheiro,
            ..input
        };
        assert!(validate_payment(&cash).is_ok());
    }
}
