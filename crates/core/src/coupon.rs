//! Coupon rules.
//!
//! A coupon is a usage-capped discount applied to a cart subtotal. The rules
//! here are evaluated twice: when a customer attaches a code to their cart,
//! and again inside the checkout transaction against the locked coupon row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::round_currency;

/// How a coupon's `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "store.discount_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `discount_value` percent off the subtotal.
    Percentage,
    /// `discount_value` currency units off the subtotal.
    Fixed,
}

impl DiscountType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

impl std::str::FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            _ => Err(format!("invalid discount type: {s}")),
        }
    }
}

/// Why a coupon cannot be used, or cannot be created.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponError {
    #[error("This coupon is no longer active")]
    Inactive,
    #[error("This coupon is not valid yet")]
    NotYetValid,
    #[error("This coupon has expired")]
    Expired,
    #[error("This coupon has reached its usage limit")]
    UsageExhausted,
    #[error("Orders must be at least {minimum} to use this coupon")]
    MinimumNotMet { minimum: Decimal },
    #[error("invalid coupon definition: {0}")]
    InvalidDefinition(&'static str),
}

/// The fields of a coupon that decide whether and how much it discounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRules {
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_order_amount: Decimal,
    pub max_uses: i32,
    pub used_count: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl CouponRules {
    /// Check the coupon can be used right now on an order of `subtotal`.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule, checked in the order: active, started,
    /// not expired, uses left, minimum order amount.
    pub fn check_usable(&self, subtotal: Decimal, now: DateTime<Utc>) -> Result<(), CouponError> {
        if !self.is_active {
            return Err(CouponError::Inactive);
        }
        if now < self.valid_from {
            return Err(CouponError::NotYetValid);
        }
        if self.valid_until.is_some_and(|until| now > until) {
            return Err(CouponError::Expired);
        }
        if self.used_count >= self.max_uses {
            return Err(CouponError::UsageExhausted);
        }
        if subtotal < self.min_order_amount {
            return Err(CouponError::MinimumNotMet {
                minimum: self.min_order_amount,
            });
        }
        Ok(())
    }

    /// The discount this coupon gives on `subtotal`, never more than the
    /// subtotal itself.
    ///
    /// # Errors
    ///
    /// See [`CouponRules::check_usable`].
    pub fn discount_for(&self, subtotal: Decimal, now: DateTime<Utc>) -> Result<Decimal, CouponError> {
        self.check_usable(subtotal, now)?;
        let discount = match self.discount_type {
            DiscountType::Percentage => {
                round_currency(subtotal * self.discount_value / Decimal::ONE_HUNDRED)
            }
            DiscountType::Fixed => self.discount_value,
        };
        Ok(discount.min(subtotal).max(Decimal::ZERO))
    }

    /// Reject coupon definitions staff should not be able to save.
    ///
    /// # Errors
    ///
    /// Returns [`CouponError::InvalidDefinition`] naming the bad field.
    pub fn validate_definition(&self) -> Result<(), CouponError> {
        if self.discount_value <= Decimal::ZERO {
            return Err(CouponError::InvalidDefinition(
                "discount value must be positive",
            ));
        }
        if self.discount_type == DiscountType::Percentage
            && self.discount_value > Decimal::ONE_HUNDRED
        {
            return Err(CouponError::InvalidDefinition(
                "percentage discounts cannot exceed 100",
            ));
        }
        if self.min_order_amount < Decimal::ZERO {
            return Err(CouponError::InvalidDefinition(
                "minimum order amount cannot be negative",
            ));
        }
        if self.max_uses < 1 {
            return Err(CouponError::InvalidDefinition("max uses must be at least 1"));
        }
        if self.valid_until.is_some_and(|until| until <= self.valid_from) {
            return Err(CouponError::InvalidDefinition(
                "coupon must end after it starts",
            ));
        }
        Ok(())
    }
}

/// Coupon codes are matched case-insensitively and stored upper-case.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn rules(discount_type: DiscountType, value: &str) -> CouponRules {
        CouponRules {
            discount_type,
            discount_value: dec(value),
            min_order_amount: Decimal::ZERO,
            max_uses: 10,
            used_count: 0,
            valid_from: Utc::now() - Duration::days(1),
            valid_until: Some(Utc::now() + Duration::days(1)),
            is_active: true,
        }
    }

    #[test]
    fn percentage_discount_rounds_to_cents() {
        let coupon = rules(DiscountType::Percentage, "15");
        assert_eq!(
            coupon.discount_for(dec("33.33"), Utc::now()).unwrap(),
            dec("5.00")
        );
        assert_eq!(
            coupon.discount_for(dec("10.10"), Utc::now()).unwrap(),
            dec("1.52")
        );
    }

    #[test]
    fn fixed_discount_is_capped_at_subtotal() {
        let coupon = rules(DiscountType::Fixed, "20.00");
        assert_eq!(
            coupon.discount_for(dec("50.00"), Utc::now()).unwrap(),
            dec("20.00")
        );
        assert_eq!(
            coupon.discount_for(dec("12.50"), Utc::now()).unwrap(),
            dec("12.50")
        );
    }

    #[test]
    fn inactive_and_expired_coupons_are_rejected() {
        let now = Utc::now();
        let mut coupon = rules(DiscountType::Fixed, "5");
        coupon.is_active = false;
        assert_eq!(coupon.discount_for(dec("30"), now), Err(CouponError::Inactive));

        let mut coupon = rules(DiscountType::Fixed, "5");
        coupon.valid_until = Some(now - Duration::hours(1));
        assert_eq!(coupon.discount_for(dec("30"), now), Err(CouponError::Expired));

        let mut coupon = rules(DiscountType::Fixed, "5");
        coupon.valid_from = now + Duration::hours(1);
        assert_eq!(
            coupon.discount_for(dec("30"), now),
            Err(CouponError::NotYetValid)
        );
    }

    #[test]
    fn open_ended_coupon_never_expires() {
        let mut coupon = rules(DiscountType::Fixed, "5");
        coupon.valid_until = None;
        let far_future = Utc::now() + Duration::days(3650);
        assert!(coupon.discount_for(dec("30"), far_future).is_ok());
    }

    #[test]
    fn usage_cap_is_enforced() {
        let mut coupon = rules(DiscountType::Percentage, "10");
        coupon.max_uses = 3;
        coupon.used_count = 3;
        assert_eq!(
            coupon.discount_for(dec("30"), Utc::now()),
            Err(CouponError::UsageExhausted)
        );
    }

    #[test]
    fn minimum_order_amount_is_enforced() {
        let mut coupon = rules(DiscountType::Fixed, "5");
        coupon.min_order_amount = dec("25.00");
        assert_eq!(
            coupon.discount_for(dec("24.99"), Utc::now()),
            Err(CouponError::MinimumNotMet {
                minimum: dec("25.00")
            })
        );
        assert!(coupon.discount_for(dec("25.00"), Utc::now()).is_ok());
    }

    #[test]
    fn definitions_are_validated() {
        assert!(rules(DiscountType::Percentage, "100").validate_definition().is_ok());
        assert!(rules(DiscountType::Percentage, "101").validate_definition().is_err());
        assert!(rules(DiscountType::Fixed, "0").validate_definition().is_err());

        let mut coupon = rules(DiscountType::Fixed, "5");
        coupon.max_uses = 0;
        assert!(coupon.validate_definition().is_err());

        let mut coupon = rules(DiscountType::Fixed, "5");
        coupon.valid_until = Some(coupon.valid_from);
        assert!(coupon.validate_definition().is_err());
    }

    #[test]
    fn codes_are_normalized() {
        assert_eq!(normalize_code("  spring10 "), "SPRING10");
    }
}
