//! Currency amounts.
//!
//! Amounts are `rust_decimal::Decimal` in major units (dollars) with two
//! decimal places. The payment provider wants integer minor units (cents).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount cannot be negative: {0}")]
    Negative(Decimal),
    #[error("amount is too large: {0}")]
    Overflow(Decimal),
}

/// Round to cents, half away from zero (`0.125` becomes `0.13`).
#[must_use]
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a major-unit amount to minor units.
///
/// # Errors
///
/// Returns [`MoneyError`] for negative amounts or values outside `i64`.
pub fn to_minor_units(amount: Decimal) -> Result<i64, MoneyError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MoneyError::Negative(amount));
    }
    (round_currency(amount) * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or(MoneyError::Overflow(amount))
}

/// Format for display, e.g. `$12.50`.
#[must_use]
pub fn format_usd(amount: Decimal) -> String {
    format!("${:.2}", round_currency(amount))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_currency(dec("0.125")), dec("0.13"));
        assert_eq!(round_currency(dec("2.004")), dec("2.00"));
        assert_eq!(round_currency(dec("19.995")), dec("20.00"));
    }

    #[test]
    fn converts_to_cents() {
        assert_eq!(to_minor_units(dec("24.99")).unwrap(), 2499);
        assert_eq!(to_minor_units(dec("5")).unwrap(), 500);
        assert_eq!(to_minor_units(Decimal::ZERO).unwrap(), 0);
        assert_eq!(
            to_minor_units(dec("-1.00")),
            Err(MoneyError::Negative(dec("-1.00")))
        );
    }

    #[test]
    fn formats_dollars() {
        assert_eq!(format_usd(dec("7")), "$7.00");
        assert_eq!(format_usd(dec("1234.5")), "$1234.50");
    }
}
