//! Aggregate queries for the dashboard and the inventory check.
//!
//! Sales figures only count orders whose payment completed. Day boundaries
//! are UTC.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;

use author_store_core::{OrderStatus, PaymentStatus};

use super::RepositoryError;
use crate::models::{
    CustomerStats, DailySales, RecentOrder, ReviewStats, SalesWindows, StockAlert, TopProduct,
};

const STOCK_ALERT_COLUMNS: &str = "id, name, slug, stock, low_stock_threshold, is_available";

/// Midnight UTC of the day containing `now`, independent of the session time zone.
fn start_of_utc_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

pub struct AnalyticsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AnalyticsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sales_windows(&self, now: DateTime<Utc>) -> Result<SalesWindows, RepositoryError> {
        Ok(sqlx::query_as::<_, SalesWindows>(
            "SELECT \
                 COUNT(*) AS total_orders, \
                 COALESCE(SUM(total), 0) AS total_revenue, \
                 COUNT(*) FILTER (WHERE created_at >= $2) AS today_orders, \
                 COALESCE(SUM(total) FILTER (WHERE created_at >= $2), 0) AS today_revenue, \
                 COUNT(*) FILTER (WHERE created_at >= $1 - INTERVAL '7 days') AS week_orders, \
                 COALESCE(SUM(total) FILTER (WHERE created_at >= $1 - INTERVAL '7 days'), 0) \
                     AS week_revenue, \
                 COUNT(*) FILTER (WHERE created_at >= $1 - INTERVAL '30 days') AS month_orders, \
                 COALESCE(SUM(total) FILTER (WHERE created_at >= $1 - INTERVAL '30 days'), 0) \
                     AS month_revenue \
             FROM store.order WHERE payment_status = 'completed'",
        )
        .bind(now)
        .bind(start_of_utc_day(now))
        .fetch_one(self.pool)
        .await?)
    }

    /// Best sellers by quantity over completed orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_products(&self, limit: i64) -> Result<Vec<TopProduct>, RepositoryError> {
        Ok(sqlx::query_as::<_, TopProduct>(
            "SELECT oi.product_name, SUM(oi.quantity)::BIGINT AS quantity_sold, \
                    SUM(oi.product_price * oi.quantity) AS revenue \
             FROM store.order_item oi \
             JOIN store.order o ON o.id = oi.order_id \
             WHERE o.payment_status = 'completed' \
             GROUP BY oi.product_name \
             ORDER BY quantity_sold DESC, revenue DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_orders(&self, limit: i64) -> Result<Vec<RecentOrder>, RepositoryError> {
        Ok(sqlx::query_as::<_, RecentOrder>(
            "SELECT o.order_number, COALESCE(u.username, 'Guest') AS customer, o.total, \
                    o.status, o.payment_status, o.created_at \
             FROM store.order o \
             LEFT JOIN store.user u ON u.id = o.user_id \
             ORDER BY o.created_at DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }

    /// Order counts per status. Statuses with no orders are absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_counts(&self) -> Result<Vec<(OrderStatus, i64)>, RepositoryError> {
        Ok(sqlx::query_as::<_, (OrderStatus, i64)>(
            "SELECT status, COUNT(*) FROM store.order GROUP BY status",
        )
        .fetch_all(self.pool)
        .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn payment_status_counts(&self) -> Result<Vec<(PaymentStatus, i64)>, RepositoryError> {
        Ok(sqlx::query_as::<_, (PaymentStatus, i64)>(
            "SELECT payment_status, COUNT(*) FROM store.order GROUP BY payment_status",
        )
        .fetch_all(self.pool)
        .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn customer_stats(&self, now: DateTime<Utc>) -> Result<CustomerStats, RepositoryError> {
        Ok(sqlx::query_as::<_, CustomerStats>(
            "SELECT \
                 COUNT(*) AS total_customers, \
                 COUNT(*) FILTER (WHERE EXISTS ( \
                     SELECT 1 FROM store.order o \
                     WHERE o.user_id = u.id AND o.payment_status = 'completed' \
                 )) AS customers_with_orders, \
                 COUNT(*) FILTER (WHERE u.created_at >= $1 - INTERVAL '30 days') \
                     AS new_customers_30_days \
             FROM store.user u WHERE NOT u.is_staff",
        )
        .bind(now)
        .fetch_one(self.pool)
        .await?)
    }

    /// Available products at or below their threshold but not sold out,
    /// lowest stock first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(&self) -> Result<Vec<StockAlert>, RepositoryError> {
        Ok(sqlx::query_as::<_, StockAlert>(&format!(
            "SELECT {STOCK_ALERT_COLUMNS} FROM store.product \
             WHERE is_available AND stock > 0 AND stock <= low_stock_threshold \
             ORDER BY stock, name"
        ))
        .fetch_all(self.pool)
        .await?)
    }

    /// Every product with no stock, available or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn out_of_stock(&self) -> Result<Vec<StockAlert>, RepositoryError> {
        Ok(sqlx::query_as::<_, StockAlert>(&format!(
            "SELECT {STOCK_ALERT_COLUMNS} FROM store.product WHERE stock = 0 ORDER BY name"
        ))
        .fetch_all(self.pool)
        .await?)
    }

    /// Mark sold-out products unavailable. Returns the products changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn disable_out_of_stock(&self) -> Result<Vec<StockAlert>, RepositoryError> {
        Ok(sqlx::query_as::<_, StockAlert>(&format!(
            "UPDATE store.product SET is_available = FALSE, updated_at = NOW() \
             WHERE stock = 0 AND is_available \
             RETURNING {STOCK_ALERT_COLUMNS}"
        ))
        .fetch_all(self.pool)
        .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn review_stats(&self) -> Result<ReviewStats, RepositoryError> {
        Ok(sqlx::query_as::<_, ReviewStats>(
            "SELECT \
                 COUNT(*) AS total_reviews, \
                 COUNT(*) FILTER (WHERE is_approved) AS approved_reviews, \
                 COUNT(*) FILTER (WHERE NOT is_approved) AS pending_reviews, \
                 ROUND(AVG(rating) FILTER (WHERE is_approved), 1) AS average_rating \
             FROM store.product_review",
        )
        .fetch_one(self.pool)
        .await?)
    }

    /// Completed sales per day from `since` onwards. Only days with sales
    /// are returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn daily_sales(&self, since: NaiveDate) -> Result<Vec<DailySales>, RepositoryError> {
        Ok(sqlx::query_as::<_, DailySales>(
            "SELECT (created_at AT TIME ZONE 'UTC')::DATE AS date, \
                    COUNT(*) AS orders, COALESCE(SUM(total), 0) AS revenue \
             FROM store.order \
             WHERE payment_status = 'completed' \
               AND (created_at AT TIME ZONE 'UTC')::DATE >= $1 \
             GROUP BY 1 ORDER BY 1",
        )
        .bind(since)
        .fetch_all(self.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn today_starts_at_utc_midnight() {
        let late = Utc.with_ymd_and_hms(2026, 10, 15, 23, 30, 5).unwrap();
        assert_eq!(
            start_of_utc_day(late),
            Utc.with_ymd_and_hms(2026, 10, 15, 0, 0, 0).unwrap()
        );

        let midnight = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();
        assert_eq!(start_of_utc_day(midnight), midnight);
    }

    #[test]
    fn today_matches_the_daily_series_date() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 15, 0).unwrap();
        assert_eq!(start_of_utc_day(now).date_naive(), now.date_naive());
    }
}
