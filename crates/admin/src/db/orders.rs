//! Order queries for the staff order screens.
//!
//! Status changes run inside a transaction owned by
//! [`crate::services::FulfillmentService`], so the writes here are free
//! functions over a `PgConnection`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use author_store_core::{
    CouponId, OrderId, OrderStatus, PaymentStatus, ProductId, TrackingEventId,
};

use super::RepositoryError;
use crate::models::{OrderDetail, OrderItem, OrderSummary, TrackingEvent};

/// Orders per page in the staff list.
pub const PAGE_SIZE: i64 = 50;

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: OrderId,
    order_number: String,
    customer: String,
    email: String,
    total: Decimal,
    status: OrderStatus,
    payment_status: PaymentStatus,
    item_count: i64,
    created_at: DateTime<Utc>,
}

impl From<SummaryRow> for OrderSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            id: row.id,
            order_number: row.order_number,
            customer: row.customer,
            email: row.email,
            total: row.total,
            status: row.status,
            payment_status: row.payment_status,
            item_count: row.item_count,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DetailRow {
    id: OrderId,
    order_number: String,
    customer: String,
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
    tracking_number: Option<String>,
    carrier: Option<String>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl DetailRow {
    fn into_detail(self, items: Vec<OrderItem>, events: Vec<TrackingEvent>) -> OrderDetail {
        OrderDetail {
            id: self.id,
            order_number: self.order_number,
            customer: self.customer,
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
            subtotal: self.subtotal,
            discount_amount: self.discount_amount,
            coupon_code: self.coupon_code,
            shipping_cost: self.shipping_cost,
            tax: self.tax,
            total: self.total,
            status: self.status,
            payment_status: self.payment_status,
            tracking_number: self.tracking_number,
            carrier: self.carrier,
            shipped_at: self.shipped_at,
            delivered_at: self.delivered_at,
            created_at: self.created_at,
            items,
            events,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    product_id: Option<ProductId>,
    product_name: String,
    product_price: Decimal,
    quantity: i32,
}

impl From<ItemRow> for OrderItem {
    fn from(row: ItemRow) -> Self {
        Self {
            product: row.product_id,
            product_name: row.product_name,
            product_price: row.product_price,
            quantity: row.quantity,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: TrackingEventId,
    status: OrderStatus,
    description: String,
    location: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for TrackingEvent {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            status: row.status,
            description: row.description,
            location: row.location,
            created_at: row.created_at,
        }
    }
}

/// Order fields a status change needs, read under a row lock.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LockedOrder {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub coupon_id: Option<CouponId>,
}

/// Order list filters.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Matches order number, email or customer name.
    pub search: Option<String>,
    /// 1-based.
    pub page: i64,
}

impl OrderFilter {
    fn apply(&self, query: &mut QueryBuilder<'_, Postgres>) {
        query.push(" WHERE TRUE");
        if let Some(status) = self.status {
            query.push(" AND o.status = ").push_bind(status);
        }
        if let Some(payment_status) = self.payment_status {
            query.push(" AND o.payment_status = ").push_bind(payment_status);
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{term}%");
            query
                .push(" AND (o.order_number ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR o.email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR (o.first_name || ' ' || o.last_name) ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        let offset = (self.page.max(1) - 1) * PAGE_SIZE;
        // One extra row tells the caller whether another page exists.
        query
            .push(" ORDER BY o.created_at DESC, o.id DESC LIMIT ")
            .push_bind(PAGE_SIZE + 1)
            .push(" OFFSET ")
            .push_bind(offset);
    }
}

/// One page of the order list.
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<OrderSummary>,
    pub page: i64,
    pub has_next: bool,
}

const SUMMARY_SELECT: &str = r"
    SELECT o.id, o.order_number, COALESCE(u.username, 'Guest') AS customer, o.email,
           o.total, o.status, o.payment_status, o.created_at,
           (SELECT COALESCE(SUM(oi.quantity), 0) FROM store.order_item oi
            WHERE oi.order_id = o.id)::BIGINT AS item_count
    FROM store.order o
    LEFT JOIN store.user u ON u.id = o.user_id";

const DETAIL_SELECT: &str = r"
    SELECT o.id, o.order_number, COALESCE(u.username, 'Guest') AS customer, o.email,
           o.first_name, o.last_name, o.address_line1, o.address_line2, o.city, o.state,
           o.postal_code, o.country, o.phone, o.subtotal, o.discount_amount, o.coupon_code,
           o.shipping_cost, o.tax, o.total, o.status, o.payment_status, o.tracking_number,
           o.carrier, o.shipped_at, o.delivered_at, o.created_at
    FROM store.order o
    LEFT JOIN store.user u ON u.id = o.user_id
    WHERE o.id = $1";

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &OrderFilter) -> Result<OrderPage, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        filter.apply(&mut query);

        let mut orders: Vec<OrderSummary> = query
            .build_query_as::<SummaryRow>()
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(OrderSummary::from)
            .collect();

        let has_next = orders.len() > usize::try_from(PAGE_SIZE).unwrap_or(usize::MAX);
        orders.truncate(usize::try_from(PAGE_SIZE).unwrap_or(usize::MAX));

        Ok(OrderPage {
            orders,
            page: filter.page.max(1),
            has_next,
        })
    }

    /// Order with its items and tracking history (oldest first).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, DetailRow>(DETAIL_SELECT)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, ItemRow>(
            "SELECT product_id, product_name, product_price, quantity \
             FROM store.order_item WHERE order_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

        let events = sqlx::query_as::<_, EventRow>(
            "SELECT id, status, description, location, created_at \
             FROM store.order_tracking_event WHERE order_id = $1 ORDER BY created_at, id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(TrackingEvent::from)
        .collect();

        Ok(Some(row.into_detail(items, events)))
    }

    /// Record a tracking note at the order's current status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn add_note(
        &self,
        id: OrderId,
        description: &str,
        location: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO store.order_tracking_event (order_id, status, description, location) \
             SELECT id, status, $2, $3 FROM store.order WHERE id = $1",
        )
        .bind(id)
        .bind(description)
        .bind(location)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// # Errors
///
/// Returns `sqlx::Error` if the query fails.
pub async fn lock_order(conn: &mut PgConnection, id: OrderId) -> Result<Option<LockedOrder>, sqlx::Error> {
    sqlx::query_as::<_, LockedOrder>(
        "SELECT id, order_number, status, payment_status, coupon_id \
         FROM store.order WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// Set the status, stamping `shipped_at`/`delivered_at` on the first move
/// into those states. Tracking details are only overwritten when given.
///
/// # Errors
///
/// Returns `sqlx::Error` if the update fails.
pub async fn apply_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
    tracking_number: Option<&str>,
    carrier: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE store.order SET \
             status = $2, \
             tracking_number = COALESCE($3, tracking_number), \
             carrier = COALESCE($4, carrier), \
             shipped_at = CASE WHEN $2 = 'shipped'::store.order_status \
                 THEN COALESCE(shipped_at, NOW()) ELSE shipped_at END, \
             delivered_at = CASE WHEN $2 = 'delivered'::store.order_status \
                 THEN COALESCE(delivered_at, NOW()) ELSE delivered_at END, \
             updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(status)
    .bind(tracking_number)
    .bind(carrier)
    .execute(conn)
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns `sqlx::Error` if the insert fails.
pub async fn add_tracking_event(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
    description: &str,
    location: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO store.order_tracking_event (order_id, status, description, location) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(status)
    .bind(description)
    .bind(location)
    .execute(conn)
    .await?;
    Ok(())
}

/// Put every item of a cancelled order back on the shelf. Items whose
/// product has since been deleted are skipped.
///
/// # Errors
///
/// Returns `sqlx::Error` if the update fails.
pub async fn restock_items(conn: &mut PgConnection, id: OrderId) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE store.product p SET stock = p.stock + oi.quantity, updated_at = NOW() \
         FROM store.order_item oi \
         WHERE oi.order_id = $1 AND oi.product_id = p.id",
    )
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns `sqlx::Error` if the update fails.
pub async fn release_coupon_use(conn: &mut PgConnection, coupon_id: CouponId) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE store.coupon SET used_count = used_count - 1 WHERE id = $1 AND used_count > 0",
    )
    .bind(coupon_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Everything a customer notification needs, read after commit.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationTarget {
    pub order_number: String,
    pub email: String,
    pub first_name: String,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
}

impl OrderRepository<'_> {
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn notification_target(
        &self,
        id: OrderId,
    ) -> Result<Option<NotificationTarget>, RepositoryError> {
        Ok(sqlx::query_as::<_, NotificationTarget>(
            "SELECT order_number, email, first_name, tracking_number, carrier \
             FROM store.order WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_pages_and_searches() {
        let filter = OrderFilter {
            status: Some(OrderStatus::Processing),
            payment_status: None,
            search: Some(" ORD-2026 ".to_string()),
            page: 3,
        };
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM store.order o");
        filter.apply(&mut query);
        let sql = query.sql();

        assert!(sql.contains("o.status = $1"));
        assert!(!sql.contains("o.payment_status ="));
        assert!(sql.contains("o.order_number ILIKE $2"));
        assert!(sql.ends_with("LIMIT $5 OFFSET $6"));
    }

    #[test]
    fn blank_filter_lists_everything_newest_first() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM store.order o");
        OrderFilter::default().apply(&mut query);
        let sql = query.sql();
        assert!(!sql.contains("ILIKE"));
        assert!(sql.contains("ORDER BY o.created_at DESC"));
    }
}
