//! JSON shapes returned by the API.
//!
//! Domain models stay free of presentation concerns; anything computed for
//! the client (`in_stock`, cart totals, coupon feedback) is assembled here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use author_store_core::{
    CartId, CartItemId, CategoryId, DiscountType, OrderTotals, PricingPolicy, ProductId,
};

use crate::models::{Cart, CartLine, Coupon, Product};

#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub category: CategoryId,
    pub category_name: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_available: bool,
    pub in_stock: bool,
    pub image: Option<String>,
    pub average_rating: Option<Decimal>,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            category: product.category_id,
            category_name: product.category_name.clone(),
            name: product.name.clone(),
            slug: product.slug.clone(),
            description: product.description.clone(),
            price: product.price,
            stock: product.stock,
            is_available: product.is_available,
            in_stock: product.in_stock(),
            image: product.image_url.clone(),
            average_rating: product.average_rating,
            review_count: product.review_count,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self::from(&product)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub id: CartItemId,
    pub product: ProductView,
    pub quantity: i32,
    pub total_price: Decimal,
    pub added_at: DateTime<Utc>,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.id,
            product: ProductView::from(&line.product),
            quantity: line.quantity,
            total_price: line.total_price(),
            added_at: line.added_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CouponSummary {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
}

/// A cart priced for display.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub id: CartId,
    pub items: Vec<CartLineView>,
    pub total_items: i64,
    pub coupon: Option<CouponSummary>,
    /// Why the attached coupon currently gives no discount.
    pub coupon_error: Option<String>,
    #[serde(flatten)]
    pub totals: OrderTotals,
}

impl CartView {
    /// Price `cart` with its attached coupon at time `now`.
    ///
    /// A coupon that no longer validates stays attached but contributes no
    /// discount, and the reason is reported in `coupon_error`.
    #[must_use]
    pub fn build(
        cart: &Cart,
        coupon: Option<&Coupon>,
        policy: &PricingPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        let subtotal = cart.subtotal();
        let (discount, coupon_error) = match coupon {
            Some(coupon) => match coupon.rules.discount_for(subtotal, now) {
                Ok(discount) => (discount, None),
                Err(e) => (Decimal::ZERO, Some(e.to_string())),
            },
            None => (Decimal::ZERO, None),
        };

        Self {
            id: cart.id,
            items: cart.lines.iter().map(CartLineView::from).collect(),
            total_items: cart.total_items(),
            coupon: coupon.map(|c| CouponSummary {
                code: c.code.clone(),
                discount_type: c.rules.discount_type,
                discount_value: c.rules.discount_value,
            }),
            coupon_error,
            totals: OrderTotals::compute(subtotal, discount, policy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use author_store_core::{CouponId, CouponRules};

    use crate::models::catalog::fixtures::product;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn cart(lines: &[(i32, &str, i32)]) -> Cart {
        Cart {
            id: CartId::new(7),
            coupon_id: None,
            lines: lines
                .iter()
                .map(|&(id, price, quantity)| CartLine {
                    id: CartItemId::new(id),
                    product: product(id, price, 20),
                    quantity,
                    added_at: Utc::now(),
                })
                .collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn coupon(discount_type: DiscountType, value: &str, minimum: &str) -> Coupon {
        Coupon {
            id: CouponId::new(1),
            code: "SPRING".to_string(),
            description: String::new(),
            rules: CouponRules {
                discount_type,
                discount_value: dec(value),
                min_order_amount: dec(minimum),
                max_uses: 10,
                used_count: 0,
                valid_from: Utc::now() - Duration::days(1),
                valid_until: None,
                is_active: true,
            },
        }
    }

    #[test]
    fn priced_without_coupon() {
        let view = CartView::build(
            &cart(&[(1, "10.00", 2), (2, "5.00", 1)]),
            None,
            &PricingPolicy::default(),
            Utc::now(),
        );

        assert_eq!(view.total_items, 3);
        assert_eq!(view.totals.subtotal, dec("25.00"));
        assert_eq!(view.totals.shipping_cost, dec("5.00"));
        assert_eq!(view.totals.tax, dec("2.00"));
        assert_eq!(view.totals.total, dec("32.00"));
        assert!(view.coupon.is_none());
        assert!(view.coupon_error.is_none());
    }

    #[test]
    fn valid_coupon_discounts_before_tax() {
        let coupon = coupon(DiscountType::Percentage, "10", "0");
        let view = CartView::build(
            &cart(&[(1, "50.00", 1)]),
            Some(&coupon),
            &PricingPolicy::default(),
            Utc::now(),
        );

        assert_eq!(view.totals.discount_amount, dec("5.00"));
        assert_eq!(view.totals.tax, dec("3.60"));
        assert_eq!(view.totals.total, dec("53.60"));
        assert_eq!(view.coupon.map(|c| c.code), Some("SPRING".to_string()));
    }

    #[test]
    fn coupon_below_minimum_stays_attached_without_discount() {
        let coupon = coupon(DiscountType::Fixed, "10", "100.00");
        let view = CartView::build(
            &cart(&[(1, "20.00", 1)]),
            Some(&coupon),
            &PricingPolicy::default(),
            Utc::now(),
        );

        assert!(view.coupon.is_some());
        assert_eq!(view.totals.discount_amount, Decimal::ZERO);
        assert!(view.coupon_error.is_some_and(|e| e.contains("100.00")));
    }

    #[test]
    fn empty_cart_is_free() {
        let view = CartView::build(&cart(&[]), None, &PricingPolicy::default(), Utc::now());
        assert_eq!(view.totals.total, Decimal::ZERO);
        assert!(view.items.is_empty());
    }

    #[test]
    fn cart_json_flattens_totals() {
        let view = CartView::build(&cart(&[(1, "10.00", 1)]), None, &PricingPolicy::default(), Utc::now());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["subtotal"], "10.00");
        assert_eq!(json["items"][0]["product"]["in_stock"], true);
        assert_eq!(json["items"][0]["product"]["category"], 1);
        assert!(json["coupon"].is_null());
    }
}
