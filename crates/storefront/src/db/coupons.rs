//! Coupon lookups and usage accounting.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use author_store_core::coupon::normalize_code;
use author_store_core::{CouponId, CouponRules, DiscountType};

use super::RepositoryError;
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
        }
    }
}

const COUPON_COLUMNS: &str = "id, code, description, discount_type, discount_value, \
     min_order_amount, max_uses, used_count, valid_from, valid_until, is_active";

pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Case-insensitive lookup by code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM store.coupon WHERE code = $1"
        ))
        .bind(normalize_code(code))
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Coupon::from))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CouponId) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM store.coupon WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Coupon::from))
    }
}

/// Load and lock a coupon row for the rest of the transaction.
///
/// # Errors
///
/// Returns `sqlx::Error` if the query fails.
pub async fn lock_coupon(conn: &mut PgConnection, id: CouponId) -> Result<Option<Coupon>, sqlx::Error> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM store.coupon WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(Coupon::from))
}

/// Count one use of a coupon. Returns `false` when the cap has been reached,
/// in which case nothing is written.
///
/// # Errors
///
/// Returns `sqlx::Error` if the update fails.
pub async fn consume_use(conn: &mut PgConnection, id: CouponId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE store.coupon SET used_count = used_count + 1 \
         WHERE id = $1 AND used_count < max_uses",
    )
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Give back a use consumed by an order that was never paid.
///
/// # Errors
///
/// Returns `sqlx::Error` if the update fails.
pub async fn release_use(conn: &mut PgConnection, id: CouponId) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE store.coupon SET used_count = used_count - 1 WHERE id = $1 AND used_count > 0")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}
