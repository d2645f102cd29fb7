//! Staff views of orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use author_store_core::{OrderId, OrderStatus, PaymentStatus, ProductId, TrackingEventId};

/// One row of the order list.
#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: String,
    /// Account username, or `Guest` when the account is gone.
    pub customer: String,
    pub email: String,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Everything shown on the order detail page.
#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub id: OrderId,
    pub order_number: String,
    pub customer: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub coupon_code: Option<String>,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    pub events: Vec<TrackingEvent>,
}

impl OrderDetail {
    #[must_use]
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Statuses staff may move this order to.
    #[must_use]
    pub fn next_statuses(&self) -> Vec<OrderStatus> {
        OrderStatus::ALL
            .into_iter()
            .filter(|next| self.status.can_transition_to(*next))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub product: Option<ProductId>,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
}

impl OrderItem {
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.product_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct TrackingEvent {
    pub id: TrackingEventId,
    pub status: OrderStatus,
    pub description: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}
