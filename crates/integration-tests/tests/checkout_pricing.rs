//! Pricing rules as checkout combines them: line subtotal, coupon discount,
//! shipping, tax and the amount charged in minor units.
//!
//! These tests need no running services.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use author_store_core::coupon::normalize_code;
use author_store_core::money::{format_usd, to_minor_units};
use author_store_core::pricing::line_subtotal;
use author_store_core::{CouponError, CouponRules, DiscountType, OrderTotals, PricingPolicy};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn now() -> DateTime<Utc> {
    "2026-10-15T12:00:00Z".parse().unwrap()
}

fn coupon(discount_type: DiscountType, value: &str) -> CouponRules {
    CouponRules {
        discount_type,
        discount_value: dec(value),
        min_order_amount: Decimal::ZERO,
        max_uses: 100,
        used_count: 0,
        valid_from: now() - Duration::days(1),
        valid_until: Some(now() + Duration::days(30)),
        is_active: true,
    }
}

fn cart_subtotal() -> Decimal {
    line_subtotal([(dec("12.50"), 2), (dec("9.99"), 1)])
}

#[test]
fn percentage_coupon_checkout_totals() {
    let subtotal = cart_subtotal();
    let discount = coupon(DiscountType::Percentage, "10")
        .discount_for(subtotal, now())
        .unwrap();
    let totals = OrderTotals::compute(subtotal, discount, &PricingPolicy::default());

    assert_eq!(totals.subtotal, dec("34.99"));
    assert_eq!(totals.discount_amount, dec("3.50"));
    assert_eq!(totals.shipping_cost, dec("5.00"));
    assert_eq!(totals.tax, dec("2.52"));
    assert_eq!(totals.total, dec("39.01"));
    assert_eq!(to_minor_units(totals.total).unwrap(), 3901);
    assert_eq!(format_usd(totals.total), "$39.01");
}

#[test]
fn fixed_coupon_never_exceeds_subtotal() {
    let subtotal = cart_subtotal();
    let discount = coupon(DiscountType::Fixed, "50")
        .discount_for(subtotal, now())
        .unwrap();
    let totals = OrderTotals::compute(subtotal, discount, &PricingPolicy::default());

    assert_eq!(totals.discount_amount, subtotal);
    assert_eq!(totals.tax, Decimal::ZERO);
    assert_eq!(totals.total, dec("5.00"));
}

#[test]
fn unusable_coupon_leaves_totals_undiscounted() {
    let subtotal = cart_subtotal();

    let mut expired = coupon(DiscountType::Percentage, "10");
    expired.valid_until = Some(now() - Duration::hours(1));
    assert_eq!(expired.discount_for(subtotal, now()), Err(CouponError::Expired));

    let mut minimum = coupon(DiscountType::Fixed, "5");
    minimum.min_order_amount = dec("50");
    assert!(matches!(
        minimum.discount_for(subtotal, now()),
        Err(CouponError::MinimumNotMet { .. })
    ));

    let totals = OrderTotals::compute(subtotal, Decimal::ZERO, &PricingPolicy::default());
    assert!(!totals.has_discount());
    assert_eq!(totals.total, dec("42.79"));
}

#[test]
fn coupon_codes_match_case_insensitively() {
    assert_eq!(normalize_code(" spring10 "), normalize_code("SPRING10"));
}

#[test]
fn empty_cart_costs_nothing() {
    let totals = OrderTotals::compute(Decimal::ZERO, Decimal::ZERO, &PricingPolicy::default());
    assert_eq!(totals.total, Decimal::ZERO);
    assert_eq!(totals.shipping_cost, Decimal::ZERO);
}
