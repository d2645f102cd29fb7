//! Placed orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use author_store_core::{
    OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, TrackingEventId, UserId,
};

/// Where an order ships and who to contact about it.
#[derive(Debug, Clone, Serialize)]
pub struct ShippingDetails {
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
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    #[serde(skip)]
    pub user_id: Option<UserId>,
    #[serde(flatten)]
    pub shipping: ShippingDetails,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub coupon_code: Option<String>,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(skip)]
    pub stripe_session_id: Option<String>,
    #[serde(skip)]
    pub idempotency_key: Uuid,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    #[must_use]
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.shipping.first_name, self.shipping.last_name)
    }
}

/// A purchased line with the name and price captured at checkout.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    /// `None` once the product has been deleted from the catalog.
    pub product: Option<ProductId>,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingEvent {
    pub id: TrackingEventId,
    pub status: OrderStatus,
    pub description: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}
