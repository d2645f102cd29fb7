//! Shopping carts and coupons.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use author_store_core::{CartId, CartItemId, CouponId, CouponRules, UserId, pricing::line_subtotal};

use super::Product;

/// Who a cart belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
    User(UserId),
    /// Anonymous visitor, identified by a random key held in their session.
    Guest(String),
}

#[derive(Debug, Clone)]
pub struct Cart {
    pub id: CartId,
    pub coupon_id: Option<CouponId>,
    pub lines: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    #[must_use]
    pub fn total_items(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.quantity)).sum()
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        line_subtotal(
            self.lines
                .iter()
                .map(|line| (line.product.price, line.quantity)),
        )
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn line(&self, id: CartItemId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == id)
    }
}

/// One product in a cart.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub id: CartItemId,
    pub product: Product,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub description: String,
    pub rules: CouponRules,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::fixtures::product;

    fn line(id: i32, price: &str, quantity: i32) -> CartLine {
        CartLine {
            id: CartItemId::new(id),
            product: product(id, price, 10),
            quantity,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn totals_sum_lines() {
        let cart = Cart {
            id: CartId::new(1),
            coupon_id: None,
            lines: vec![line(1, "12.00", 2), line(2, "4.50", 3)],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.subtotal(), "37.50".parse::<Decimal>().unwrap_or_default());
        assert_eq!(
            cart.line(CartItemId::new(2)).map(CartLine::total_price),
            Some("13.50".parse::<Decimal>().unwrap_or_default())
        );
        assert!(cart.line(CartItemId::new(9)).is_none());
    }
}
