//! Dashboard analytics.
//!
//! [`DashboardData`] backs both the dashboard page and
//! `GET /api/analytics/dashboard`.

use std::collections::HashMap;

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use author_store_core::money::round_currency;
use author_store_core::{OrderStatus, PaymentStatus};

use crate::db::{AnalyticsRepository, RepositoryError};
use crate::models::{
    CustomerStats, DailySales, RecentOrder, ReviewStats, SalesWindows, StockAlert, TopProduct,
};

const TOP_PRODUCTS: i64 = 5;
const RECENT_ORDERS: i64 = 10;
const DAILY_SALES_DAYS: u64 = 30;

#[derive(Debug, Clone, Serialize)]
pub struct SalesOverview {
    #[serde(flatten)]
    pub windows: SalesWindows,
    pub average_order_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: &'static str,
    pub label: &'static str,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryAlerts {
    pub low_stock_count: usize,
    pub out_of_stock_count: usize,
    pub low_stock: Vec<StockAlert>,
    pub out_of_stock: Vec<StockAlert>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub generated_at: DateTime<Utc>,
    pub sales: SalesOverview,
    pub top_products: Vec<TopProduct>,
    pub recent_orders: Vec<RecentOrder>,
    pub order_statuses: Vec<StatusCount>,
    pub payment_statuses: Vec<StatusCount>,
    pub customers: CustomerStats,
    pub inventory: InventoryAlerts,
    pub reviews: ReviewStats,
    pub daily_sales: Vec<DailySales>,
}

pub struct AnalyticsService<'a> {
    analytics: AnalyticsRepository<'a>,
}

impl<'a> AnalyticsService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            analytics: AnalyticsRepository::new(pool),
        }
    }

    /// Gather every dashboard figure as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    #[tracing::instrument(skip(self))]
    pub async fn dashboard(&self, now: DateTime<Utc>) -> Result<DashboardData, RepositoryError> {
        let today = now.date_naive();
        let since = first_day(today);

        let (windows, top_products, recent_orders, order_counts, payment_counts) = tokio::try_join!(
            self.analytics.sales_windows(now),
            self.analytics.top_products(TOP_PRODUCTS),
            self.analytics.recent_orders(RECENT_ORDERS),
            self.analytics.status_counts(),
            self.analytics.payment_status_counts(),
        )?;
        let (customers, low_stock, out_of_stock, reviews, sparse_sales) = tokio::try_join!(
            self.analytics.customer_stats(now),
            self.analytics.low_stock(),
            self.analytics.out_of_stock(),
            self.analytics.review_stats(),
            self.analytics.daily_sales(since),
        )?;

        Ok(DashboardData {
            generated_at: now,
            sales: SalesOverview {
                average_order_value: average_order_value(windows.total_revenue, windows.total_orders),
                windows,
            },
            top_products,
            recent_orders,
            order_statuses: order_breakdown(&order_counts),
            payment_statuses: payment_breakdown(&payment_counts),
            customers,
            inventory: InventoryAlerts {
                low_stock_count: low_stock.len(),
                out_of_stock_count: out_of_stock.len(),
                low_stock,
                out_of_stock,
            },
            reviews,
            daily_sales: fill_daily_sales(&sparse_sales, since, today),
        })
    }
}

/// First day of the daily sales window ending `today`.
fn first_day(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(DAILY_SALES_DAYS - 1))
        .unwrap_or(today)
}

#[must_use]
pub fn average_order_value(revenue: Decimal, orders: i64) -> Decimal {
    if orders <= 0 {
        return Decimal::ZERO;
    }
    round_currency(revenue / Decimal::from(orders))
}

/// One entry per day from `from` to `to` inclusive; days missing from
/// `sales` are reported as zero.
#[must_use]
pub fn fill_daily_sales(sales: &[DailySales], from: NaiveDate, to: NaiveDate) -> Vec<DailySales> {
    let by_date: HashMap<NaiveDate, &DailySales> = sales.iter().map(|d| (d.date, d)).collect();

    from.iter_days()
        .take_while(|date| *date <= to)
        .map(|date| {
            by_date.get(&date).map_or_else(
                || DailySales {
                    date,
                    orders: 0,
                    revenue: Decimal::ZERO,
                },
                |&day| day.clone(),
            )
        })
        .collect()
}

/// Counts for every order status in lifecycle order, zeros included.
#[must_use]
pub fn order_breakdown(counts: &[(OrderStatus, i64)]) -> Vec<StatusCount> {
    OrderStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status: status.as_str(),
            label: status.label(),
            count: lookup(counts, status),
        })
        .collect()
}

#[must_use]
pub fn payment_breakdown(counts: &[(PaymentStatus, i64)]) -> Vec<StatusCount> {
    PaymentStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status: status.as_str(),
            label: status.label(),
            count: lookup(counts, status),
        })
        .collect()
}

fn lookup<S: PartialEq>(counts: &[(S, i64)], status: S) -> i64 {
    counts
        .iter()
        .find(|(s, _)| *s == status)
        .map_or(0, |(_, count)| *count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn daily_sales_fill_gaps_with_zero() {
        let sparse = vec![
            DailySales {
                date: date("2026-10-02"),
                orders: 3,
                revenue: Decimal::new(4500, 2),
            },
            DailySales {
                date: date("2026-10-04"),
                orders: 1,
                revenue: Decimal::new(999, 2),
            },
        ];

        let filled = fill_daily_sales(&sparse, date("2026-10-01"), date("2026-10-05"));

        assert_eq!(filled.len(), 5);
        assert_eq!(filled[0].orders, 0);
        assert_eq!(filled[1].orders, 3);
        assert_eq!(filled[2].revenue, Decimal::ZERO);
        assert_eq!(filled[3].revenue, Decimal::new(999, 2));
        assert_eq!(filled[4].date, date("2026-10-05"));
    }

    #[test]
    fn window_covers_thirty_days_including_today() {
        let today = date("2026-10-15");
        let from = first_day(today);
        assert_eq!(from, date("2026-09-16"));
        assert_eq!(fill_daily_sales(&[], from, today).len(), 30);
    }

    #[test]
    fn average_order_value_handles_no_orders() {
        assert_eq!(average_order_value(Decimal::new(10000, 2), 0), Decimal::ZERO);
        assert_eq!(
            average_order_value(Decimal::new(10000, 2), 3),
            Decimal::new(3333, 2)
        );
    }

    #[test]
    fn sales_overview_serializes_flat() {
        let overview = SalesOverview {
            windows: SalesWindows {
                total_orders: 2,
                total_revenue: Decimal::new(3000, 2),
                today_orders: 1,
                today_revenue: Decimal::new(1000, 2),
                week_orders: 2,
                week_revenue: Decimal::new(3000, 2),
                month_orders: 2,
                month_revenue: Decimal::new(3000, 2),
            },
            average_order_value: Decimal::new(1500, 2),
        };

        let json = serde_json::to_value(&overview).unwrap();
        assert_eq!(json["total_orders"], 2);
        assert_eq!(json["today_revenue"], "10.00");
        assert_eq!(json["average_order_value"], "15.00");
        assert!(json.get("windows").is_none());
    }

    #[test]
    fn breakdown_lists_every_status() {
        let counts = vec![(OrderStatus::Shipped, 4), (OrderStatus::Pending, 2)];
        let breakdown = order_breakdown(&counts);

        assert_eq!(breakdown.len(), 5);
        assert_eq!(breakdown[0].status, "pending");
        assert_eq!(breakdown[0].count, 2);
        assert_eq!(breakdown[1].count, 0);
        assert_eq!(breakdown[2].count, 4);

        let payments = payment_breakdown(&[]);
        assert_eq!(payments.len(), 4);
        assert!(payments.iter().all(|p| p.count == 0));
    }
}
