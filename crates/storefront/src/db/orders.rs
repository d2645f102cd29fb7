//! Order queries.
//!
//! Reads go through [`OrderRepository`]. Writes happen inside the checkout
//! and webhook transactions, so they are free functions over a
//! `PgConnection`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use author_store_core::{
    CouponId, OrderId, OrderItemId, OrderStatus, OrderTotals, PaymentStatus, ProductId,
    TrackingEventId, UserId,
};

use super::RepositoryError;
use crate::models::{Order, OrderItem, ShippingDetails, TrackingEvent};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    user_id: Option<UserId>,
    email: String,
    first_name: String,
    last_name: String,
    address_line1: String,
    address_line2: String,
    city: String,
    state: String,
    postal_code: String,
    country: String,
    phone: String,
    subtotal: Decimal,
    discount_amount: Decimal,
    coupon_code: Option<String>,
    shipping_cost: Decimal,
    tax: Decimal,
    total: Decimal,
    status: OrderStatus,
    payment_status: PaymentStatus,
    stripe_session_id: Option<String>,
    idempotency_key: Uuid,
    tracking_number: Option<String>,
    carrier: Option<String>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            shipping: ShippingDetails {
                email: self.email,
                first_name: self.first_name,
                last_name: self.last_name,
                address_line1: self.address_line1,
                address_line2: self.address_line2,
                city: self.city,
                state: self.state,
                postal_code: self.postal_code,
                country: self.country,
                phone: self.phone,
            },
            subtotal: self.subtotal,
            discount_amount: self.discount_amount,
            coupon_code: self.coupon_code,
            shipping_cost: self.shipping_cost,
            tax: self.tax,
            total: self.total,
            status: self.status,
            payment_status: self.payment_status,
            stripe_session_id: self.stripe_session_id,
            idempotency_key: self.idempotency_key,
            tracking_number: self.tracking_number,
            carrier: self.carrier,
            shipped_at: self.shipped_at,
            delivered_at: self.delivered_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: Option<ProductId>,
    product_name: String,
    product_price: Decimal,
    quantity: i32,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            product: row.product_id,
            product_name: row.product_name,
            product_price: row.product_price,
            quantity: row.quantity,
            total_price: row.product_price * Decimal::from(row.quantity),
        }
    }
}

#[derive(sqlx::FromRow)]
struct TrackingEventRow {
    id: TrackingEventId,
    status: OrderStatus,
    description: String,
    location: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<TrackingEventRow> for TrackingEvent {
    fn from(row: TrackingEventRow) -> Self {
        Self {
            id: row.id,
            status: row.status,
            description: row.description,
            location: row.location,
            created_at: row.created_at,
        }
    }
}

/// The fields the payment webhook needs, read under a row lock.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderState {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub coupon_id: Option<CouponId>,
}

/// A new order ready to insert.
#[derive(Debug)]
pub struct NewOrder<'a> {
    pub order_number: &'a str,
    pub user_id: UserId,
    pub shipping: &'a ShippingDetails,
    pub totals: OrderTotals,
    pub coupon: Option<(CouponId, &'a str)>,
    pub idempotency_key: Uuid,
}

/// A purchased line, priced at checkout time.
#[derive(Debug)]
pub struct NewOrderItem<'a> {
    pub product_id: ProductId,
    pub product_name: &'a str,
    pub product_price: Decimal,
    pub quantity: i32,
}

const ORDER_COLUMNS: &str = "id, order_number, user_id, email, first_name, last_name, \
     address_line1, address_line2, city, state, postal_code, country, phone, \
     subtotal, discount_amount, coupon_code, shipping_cost, tax, total, \
     status, payment_status, stripe_session_id, idempotency_key, \
     tracking_number, carrier, shipped_at, delivered_at, created_at, updated_at";

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A customer's orders, newest first, with items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM store.order WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// One of the customer's orders. Other customers' orders are not found.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(&self, id: OrderId, user_id: UserId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM store.order WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(self.with_items(row.into_iter().collect()).await?.pop())
    }

    /// Find the customer's order created for a checkout session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_session_for_user(
        &self,
        session_id: &str,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM store.order WHERE stripe_session_id = $1 AND user_id = $2"
        ))
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(self.with_items(row.into_iter().collect()).await?.pop())
    }

    /// Any order by id, for notifications.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM store.order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(self.with_items(row.into_iter().collect()).await?.pop())
    }

    /// Tracking history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tracking_events(&self, order_id: OrderId) -> Result<Vec<TrackingEvent>, RepositoryError> {
        let rows = sqlx::query_as::<_, TrackingEventRow>(
            "SELECT id, status, description, location, created_at \
             FROM store.order_tracking_event WHERE order_id = $1 ORDER BY created_at, id",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(TrackingEvent::from).collect())
    }

    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();

        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, product_name, product_price, quantity \
             FROM store.order_item WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            items_by_order
                .entry(row.order_id)
                .or_default()
                .push(OrderItem::from(row));
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect())
    }
}

// =============================================================================
// Transactional writes
// =============================================================================

/// # Errors
///
/// Returns `sqlx::Error` if the insert fails.
pub async fn insert_order(conn: &mut PgConnection, new: &NewOrder<'_>) -> Result<OrderId, sqlx::Error> {
    let (coupon_id, coupon_code) = new.coupon.map_or((None, None), |(id, code)| (Some(id), Some(code)));

    sqlx::query_scalar::<_, OrderId>(
        "INSERT INTO store.order ( \
             order_number, user_id, email, first_name, last_name, address_line1, address_line2, \
             city, state, postal_code, country, phone, \
             subtotal, discount_amount, coupon_id, coupon_code, shipping_cost, tax, total, \
             idempotency_key \
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, \
                   $13, $14, $15, $16, $17, $18, $19, $20) \
         RETURNING id",
    )
    .bind(new.order_number)
    .bind(new.user_id)
    .bind(&new.shipping.email)
    .bind(&new.shipping.first_name)
    .bind(&new.shipping.last_name)
    .bind(&new.shipping.address_line1)
    .bind(&new.shipping.address_line2)
    .bind(&new.shipping.city)
    .bind(&new.shipping.state)
    .bind(&new.shipping.postal_code)
    .bind(&new.shipping.country)
    .bind(&new.shipping.phone)
    .bind(new.totals.subtotal)
    .bind(new.totals.discount_amount)
    .bind(coupon_id)
    .bind(coupon_code)
    .bind(new.totals.shipping_cost)
    .bind(new.totals.tax)
    .bind(new.totals.total)
    .bind(new.idempotency_key)
    .fetch_one(conn)
    .await
}

/// Insert an order line and take its quantity out of stock.
///
/// Returns `false` (and writes nothing) if stock has run out.
///
/// # Errors
///
/// Returns `sqlx::Error` if a statement fails.
pub async fn insert_item_and_reserve_stock(
    conn: &mut PgConnection,
    order_id: OrderId,
    item: &NewOrderItem<'_>,
) -> Result<bool, sqlx::Error> {
    let reserved = sqlx::query(
        "UPDATE store.product SET stock = stock - $2, updated_at = NOW() \
         WHERE id = $1 AND stock >= $2",
    )
    .bind(item.product_id)
    .bind(item.quantity)
    .execute(&mut *conn)
    .await?;

    if reserved.rows_affected() != 1 {
        return Ok(false);
    }

    sqlx::query(
        "INSERT INTO store.order_item (order_id, product_id, product_name, product_price, quantity) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.product_name)
    .bind(item.product_price)
    .bind(item.quantity)
    .execute(&mut *conn)
    .await?;

    Ok(true)
}

/// Put every item of an order back into stock.
///
/// # Errors
///
/// Returns `sqlx::Error` if the update fails.
pub async fn restock_items(conn: &mut PgConnection, order_id: OrderId) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE store.product p SET stock = p.stock + oi.quantity, updated_at = NOW() \
         FROM store.order_item oi \
         WHERE oi.order_id = $1 AND oi.product_id = p.id",
    )
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns `sqlx::Error` if the insert fails.
pub async fn add_tracking_event(
    conn: &mut PgConnection,
    order_id: OrderId,
    status: OrderStatus,
    description: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO store.order_tracking_event (order_id, status, description) VALUES ($1, $2, $3)",
    )
    .bind(order_id)
    .bind(status)
    .bind(description)
    .execute(conn)
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns `sqlx::Error` if the update fails.
pub async fn set_checkout_session(
    conn: &mut PgConnection,
    order_id: OrderId,
    session_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE store.order SET stripe_session_id = $2, updated_at = NOW() WHERE id = $1")
        .bind(order_id)
        .bind(session_id)
        .execute(conn)
        .await?;
    Ok(())
}

const STATE_COLUMNS: &str = "id, order_number, status, payment_status, coupon_id";

/// Lock the order created for a checkout session.
///
/// # Errors
///
/// Returns `sqlx::Error` if the query fails.
pub async fn lock_by_checkout_session(
    conn: &mut PgConnection,
    session_id: &str,
) -> Result<Option<OrderState>, sqlx::Error> {
    sqlx::query_as::<_, OrderState>(&format!(
        "SELECT {STATE_COLUMNS} FROM store.order WHERE stripe_session_id = $1 FOR UPDATE"
    ))
    .bind(session_id)
    .fetch_optional(conn)
    .await
}

/// Lock an order by id.
///
/// # Errors
///
/// Returns `sqlx::Error` if the query fails.
pub async fn lock_by_id(conn: &mut PgConnection, id: OrderId) -> Result<Option<OrderState>, sqlx::Error> {
    sqlx::query_as::<_, OrderState>(&format!(
        "SELECT {STATE_COLUMNS} FROM store.order WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// Lock the order paid by a payment intent.
///
/// # Errors
///
/// Returns `sqlx::Error` if the query fails.
pub async fn lock_by_payment_intent(
    conn: &mut PgConnection,
    payment_intent_id: &str,
) -> Result<Option<OrderState>, sqlx::Error> {
    sqlx::query_as::<_, OrderState>(&format!(
        "SELECT {STATE_COLUMNS} FROM store.order WHERE stripe_payment_intent_id = $1 FOR UPDATE"
    ))
    .bind(payment_intent_id)
    .fetch_optional(conn)
    .await
}

/// # Errors
///
/// Returns `sqlx::Error` if the update fails.
pub async fn set_payment_status(
    conn: &mut PgConnection,
    order_id: OrderId,
    status: PaymentStatus,
    payment_intent_id: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE store.order SET payment_status = $2, \
             stripe_payment_intent_id = COALESCE($3, stripe_payment_intent_id), \
             updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(order_id)
    .bind(status)
    .bind(payment_intent_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns `sqlx::Error` if the update fails.
pub async fn set_order_status(
    conn: &mut PgConnection,
    order_id: OrderId,
    status: OrderStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE store.order SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(order_id)
        .bind(status)
        .execute(conn)
        .await?;
    Ok(())
}
