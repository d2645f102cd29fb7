//! Read models behind the dashboard.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use author_store_core::{OrderStatus, PaymentStatus};

/// Payment-completed order counts and revenue over fixed windows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SalesWindows {
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub today_orders: i64,
    pub today_revenue: Decimal,
    pub week_orders: i64,
    pub week_revenue: Decimal,
    pub month_orders: i64,
    pub month_revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_name: String,
    pub quantity_sold: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentOrder {
    pub order_number: String,
    pub customer: String,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CustomerStats {
    /// Non-staff accounts.
    pub total_customers: i64,
    /// Customers with at least one payment-completed order.
    pub customers_with_orders: i64,
    pub new_customers_30_days: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ReviewStats {
    pub total_reviews: i64,
    pub approved_reviews: i64,
    pub pending_reviews: i64,
    /// Mean approved rating to one decimal place.
    pub average_rating: Option<Decimal>,
}

/// One day of completed sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DailySales {
    pub date: NaiveDate,
    pub orders: i64,
    pub revenue: Decimal,
}

/// Low-stock or out-of-stock product as listed in alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StockAlert {
    pub id: author_store_core::ProductId,
    pub name: String,
    pub slug: String,
    pub stock: i32,
    pub low_stock_threshold: i32,
    pub is_available: bool,
}
