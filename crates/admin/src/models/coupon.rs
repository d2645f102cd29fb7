//! Discount codes.

use chrono::{DateTime, Utc};

use author_store_core::{CouponId, CouponRules};

#[derive(Debug, Clone)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub description: String,
    pub rules: CouponRules,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Uses left before the cap is reached.
    #[must_use]
    pub const fn remaining_uses(&self) -> i32 {
        self.rules.max_uses.saturating_sub(self.rules.used_count)
    }
}
