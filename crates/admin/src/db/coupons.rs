//! Coupon administration.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use author_store_core::coupon::normalize_code;
use author_store_core::{CouponId, CouponRules, DiscountType};

use super::{RepositoryError, conflict_on_unique};
use crate::models::Coupon;

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: CouponId,
    code: String,
    description: String,
    discount_type: DiscountType,
    discount_value: Decimal,
    min_order_amount: Decimal,
    max_uses: i32,
    used_count: i32,
    valid_from: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            description: row.description,
            rules: CouponRules {
                discount_type: row.discount_type,
                discount_value: row.discount_value,
                min_order_amount: row.min_order_amount,
                max_uses: row.max_uses,
                used_count: row.used_count,
                valid_from: row.valid_from,
                valid_until: row.valid_until,
                is_active: row.is_active,
            },
            created_at: row.created_at,
        }
    }
}

pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let rows = sqlx::query_as::<_, CouponRow>(
            "SELECT id, code, description, discount_type, discount_value, min_order_amount, \
                    max_uses, used_count, valid_from, valid_until, is_active, created_at \
             FROM store.coupon ORDER BY created_at DESC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Coupon::from).collect())
    }

    /// Store a new coupon. The code is upper-cased; `used_count` starts at 0.
    ///
    /// Callers validate `rules` with [`CouponRules::validate_definition`] first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists.
    pub async fn create(
        &self,
        code: &str,
        description: &str,
        rules: &CouponRules,
    ) -> Result<CouponId, RepositoryError> {
        sqlx::query_scalar::<_, CouponId>(
            "INSERT INTO store.coupon \
                 (code, description, discount_type, discount_value, min_order_amount, \
                  max_uses, valid_from, valid_until, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id",
        )
        .bind(normalize_code(code))
        .bind(description.trim())
        .bind(rules.discount_type)
        .bind(rules.discount_value)
        .bind(rules.min_order_amount)
        .bind(rules.max_uses)
        .bind(rules.valid_from)
        .bind(rules.valid_until)
        .bind(rules.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A coupon with this code already exists"))
    }

    /// Flip `is_active`, returning the new value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    pub async fn toggle_active(&self, id: CouponId) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>(
            "UPDATE store.coupon SET is_active = NOT is_active WHERE id = $1 RETURNING is_active",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
