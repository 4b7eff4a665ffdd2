//! Money bounds and checked arithmetic.
//!
//! Amounts are stored as SQLite REAL, so every value written must survive a
//! round trip through `f64` at two decimal places. The caps below keep prices,
//! subtotals and totals well inside that range, and every multiplication or
//! sum goes through `checked_*` so oversized input becomes
//! [`Error::InvalidAmount`] instead of a panic.

use crate::errors::{Error, Result};
use rust_decimal::Decimal;

/// Largest accepted unit price or deposit: 9,999,999.99
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, 2);

/// Largest accepted line subtotal or order total: 999,999,999,999.99
pub const MAX_TOTAL: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Accepts non-negative amounts with at most two decimal places, up to
/// [`MAX_AMOUNT`].
///
/// `4.500` is fine: trailing zeros do not count as precision.
///
/// # Errors
/// `InvalidAmount` otherwise.
pub fn validate_amount(amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO || amount > MAX_AMOUNT || amount.normalize().scale() > 2 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

fn bounded(amount: Decimal) -> Result<Decimal> {
    if amount > MAX_TOTAL {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

/// `quantity * unit_price`, bounded by [`MAX_TOTAL`].
///
/// # Errors
/// `InvalidAmount` on overflow or when the product exceeds the cap.
pub fn line_subtotal(unit_price: Decimal, quantity: i32) -> Result<Decimal> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .ok_or(Error::InvalidAmount { amount: unit_price })
        .and_then(bounded)
}

/// Sum of `amounts`, bounded by [`MAX_TOTAL`] after every step.
///
/// # Errors
/// `InvalidAmount` on overflow or when the running sum exceeds the cap.
pub fn sum_amounts(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| {
        total
            .checked_add(amount)
            .ok_or(Error::InvalidAmount { amount })
            .and_then(bounded)
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_caps_have_two_decimal_places() {
        assert_eq!(MAX_AMOUNT, Decimal::from_str("9999999.99").unwrap());
        assert_eq!(MAX_TOTAL, Decimal::from_str("999999999999.99").unwrap());
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(Decimal::ZERO).is_ok());
        assert!(validate_amount(Decimal::from_str("4.500").unwrap()).is_ok());
        assert!(validate_amount(MAX_AMOUNT).is_ok());

        for bad in ["-0.01", "0.125", "1234567890.123456789", "10000000.00"] {
            let amount = Decimal::from_str(bad).unwrap();
            assert!(
                matches!(validate_amount(amount), Err(Error::InvalidAmount { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_line_subtotal_rejects_overflow() {
        assert_eq!(line_subtotal(Decimal::new(1250, 2), 3).unwrap(), Decimal::new(3750, 2));
        assert!(matches!(
            line_subtotal(Decimal::MAX, 2),
            Err(Error::InvalidAmount { .. })
        ));
        assert!(matches!(
            line_subtotal(MAX_AMOUNT, i32::MAX),
            Err(Error::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_sum_amounts_rejects_overflow() {
        let sum = sum_amounts([Decimal::new(1250, 2), Decimal::new(375, 2)]).unwrap();
        assert_eq!(sum, Decimal::new(1625, 2));
        assert_eq!(sum_amounts([]).unwrap(), Decimal::ZERO);
        assert!(matches!(
            sum_amounts([Decimal::MAX, Decimal::MAX]),
            Err(Error::InvalidAmount { .. })
        ));
        assert!(matches!(
            sum_amounts([MAX_TOTAL, Decimal::ONE]),
            Err(Error::InvalidAmount { .. })
        ));
    }
}
