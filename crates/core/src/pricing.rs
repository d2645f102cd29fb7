//! Order total computation.
//!
//! Shipping is a flat rate per order; tax applies to the discounted
//! subtotal. Every component is rounded to cents before it is summed so the
//! stored parts always add up to the stored total.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::round_currency;

/// Store-wide shipping and tax settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub shipping_flat_rate: Decimal,
    /// Fraction, e.g. `0.08` for 8%.
    pub tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            shipping_flat_rate: Decimal::new(500, 2),
            tax_rate: Decimal::new(8, 2),
        }
    }
}

/// The priced breakdown of a cart or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Price a subtotal with an already-computed discount.
    ///
    /// The discount is clamped to `0..=subtotal`. An empty subtotal ships for
    /// free so an empty cart shows a zero total.
    #[must_use]
    pub fn compute(subtotal: Decimal, discount: Decimal, policy: &PricingPolicy) -> Self {
        let subtotal = round_currency(subtotal.max(Decimal::ZERO));
        let discount_amount = round_currency(discount.clamp(Decimal::ZERO, subtotal));
        let shipping_cost = if subtotal.is_zero() {
            Decimal::ZERO
        } else {
            round_currency(policy.shipping_flat_rate)
        };
        let tax = round_currency((subtotal - discount_amount) * policy.tax_rate);
        let total = subtotal - discount_amount + shipping_cost + tax;

        Self {
            subtotal,
            discount_amount,
            shipping_cost,
            tax,
            total,
        }
    }

    #[must_use]
    pub fn has_discount(&self) -> bool {
        self.discount_amount > Decimal::ZERO
    }
}

/// Sum of `price * quantity` over cart or order lines.
#[must_use]
pub fn line_subtotal<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    lines
        .into_iter()
        .map(|(price, quantity)| price * Decimal::from(quantity))
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn totals_without_discount() {
        let totals = OrderTotals::compute(dec("40.00"), Decimal::ZERO, &PricingPolicy::default());
        assert_eq!(totals.shipping_cost, dec("5.00"));
        assert_eq!(totals.tax, dec("3.20"));
        assert_eq!(totals.total, dec("48.20"));
        assert!(!totals.has_discount());
    }

    #[test]
    fn tax_applies_after_discount() {
        let totals = OrderTotals::compute(dec("40.00"), dec("10.00"), &PricingPolicy::default());
        assert_eq!(totals.tax, dec("2.40"));
        assert_eq!(totals.total, dec("37.40"));
    }

    #[test]
    fn discount_is_clamped_to_subtotal() {
        let totals = OrderTotals::compute(dec("8.00"), dec("20.00"), &PricingPolicy::default());
        assert_eq!(totals.discount_amount, dec("8.00"));
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, dec("5.00"));
    }

    #[test]
    fn empty_cart_costs_nothing() {
        let totals = OrderTotals::compute(Decimal::ZERO, Decimal::ZERO, &PricingPolicy::default());
        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(totals.shipping_cost, Decimal::ZERO);
    }

    #[test]
    fn parts_sum_to_total() {
        let policy = PricingPolicy {
            shipping_flat_rate: dec("4.95"),
            tax_rate: dec("0.0725"),
        };
        let totals = OrderTotals::compute(dec("19.99"), dec("2.00"), &policy);
        assert_eq!(
            totals.subtotal - totals.discount_amount + totals.shipping_cost + totals.tax,
            totals.total
        );
        assert_eq!(totals.tax, dec("1.30"));
    }

    #[test]
    fn subtotal_sums_lines() {
        let subtotal = line_subtotal([(dec("12.50"), 2), (dec("3.99"), 3)]);
        assert_eq!(subtotal, dec("36.97"));
    }
}
