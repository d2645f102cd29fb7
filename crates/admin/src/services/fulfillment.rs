//! Order fulfilment: status changes made by staff.
//!
//! Every change runs in one transaction that locks the order row, validates
//! the move against the order lifecycle, stamps `shipped_at`/`delivered_at`
//! and appends a tracking event. Cancelling also restocks the items and, if
//! the customer never paid, gives the coupon use back. Customer emails go out
//! after commit and never fail the change.

use std::str::FromStr;

use sqlx::PgPool;
use thiserror::Error;

use author_store_core::{OrderId, OrderStatus, PaymentStatus, StatusTransitionError};

use crate::db::orders::{self, OrderRepository};
use crate::db::RepositoryError;
use crate::services::EmailService;

#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("Order not found")]
    NotFound,

    #[error("{0}")]
    Transition(#[from] StatusTransitionError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A requested status change.
#[derive(Debug, Clone, Copy)]
pub struct StatusChange<'a> {
    pub status: OrderStatus,
    pub tracking_number: Option<&'a str>,
    pub carrier: Option<&'a str>,
    /// Replaces the default tracking event description.
    pub note: Option<&'a str>,
}

impl<'a> StatusChange<'a> {
    #[must_use]
    pub const fn to(status: OrderStatus) -> Self {
        Self {
            status,
            tracking_number: None,
            carrier: None,
            note: None,
        }
    }
}

/// Actions offered on the order list's bulk form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    MarkProcessing,
    MarkShipped,
    MarkDelivered,
    Cancel,
}

impl BulkAction {
    #[must_use]
    pub const fn target(self) -> OrderStatus {
        match self {
            Self::MarkProcessing => OrderStatus::Processing,
            Self::MarkShipped => OrderStatus::Shipped,
            Self::MarkDelivered => OrderStatus::Delivered,
            Self::Cancel => OrderStatus::Cancelled,
        }
    }
}

impl FromStr for BulkAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mark_processing" => Ok(Self::MarkProcessing),
            "mark_shipped" => Ok(Self::MarkShipped),
            "mark_delivered" => Ok(Self::MarkDelivered),
            "cancel" => Ok(Self::Cancel),
            other => Err(format!("Unknown bulk action: {other}")),
        }
    }
}

/// Result of a bulk action. Failures do not stop the remaining orders.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub updated: usize,
    pub errors: Vec<String>,
}

/// Tracking event text used when staff leave no note.
#[must_use]
pub fn default_event_description(
    status: OrderStatus,
    tracking_number: Option<&str>,
    carrier: Option<&str>,
) -> String {
    match status {
        OrderStatus::Pending => "Order placed".to_owned(),
        OrderStatus::Processing => "Order is being prepared".to_owned(),
        OrderStatus::Shipped => match (carrier, tracking_number) {
            (Some(carrier), Some(tracking)) => format!("Shipped via {carrier} ({tracking})"),
            (Some(carrier), None) => format!("Shipped via {carrier}"),
            (None, Some(tracking)) => format!("Shipped ({tracking})"),
            (None, None) => "Shipped".to_owned(),
        },
        OrderStatus::Delivered => "Delivered".to_owned(),
        OrderStatus::Cancelled => "Order cancelled".to_owned(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub struct FulfillmentService<'a> {
    pool: &'a PgPool,
    email: Option<&'a EmailService>,
}

impl<'a> FulfillmentService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: Option<&'a EmailService>) -> Self {
        Self { pool, email }
    }

    /// Move one order to a new status.
    ///
    /// # Errors
    ///
    /// Returns `FulfillmentError::NotFound` for unknown orders and
    /// `FulfillmentError::Transition` for moves outside the lifecycle.
    #[tracing::instrument(skip(self, change), fields(status = %change.status))]
    pub async fn update_status(
        &self,
        id: OrderId,
        change: &StatusChange<'_>,
    ) -> Result<(), FulfillmentError> {
        let tracking_number = non_blank(change.tracking_number);
        let carrier = non_blank(change.carrier);

        let mut tx = self.pool.begin().await?;

        let order = orders::lock_order(&mut tx, id)
            .await?
            .ok_or(FulfillmentError::NotFound)?;
        let status = order.status.transition_to(change.status)?;

        orders::apply_status(&mut tx, id, status, tracking_number, carrier).await?;

        let description = non_blank(change.note).map_or_else(
            || default_event_description(status, tracking_number, carrier),
            str::to_owned,
        );
        orders::add_tracking_event(&mut tx, id, status, &description, None).await?;

        if status == OrderStatus::Cancelled {
            orders::restock_items(&mut tx, id).await?;
            if order.payment_status != PaymentStatus::Completed
                && let Some(coupon_id) = order.coupon_id
            {
                orders::release_coupon_use(&mut tx, coupon_id).await?;
            }
        }

        tx.commit().await?;

        tracing::info!(
            order_number = %order.order_number,
            from = %order.status,
            to = %status,
            "Order status updated"
        );

        self.notify(id, status).await;
        Ok(())
    }

    /// Apply one action to many orders, each in its own transaction.
    pub async fn bulk(&self, action: BulkAction, ids: &[OrderId]) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        let change = StatusChange::to(action.target());

        for &id in ids {
            match self.update_status(id, &change).await {
                Ok(()) => outcome.updated += 1,
                Err(e) => outcome.errors.push(format!("Order {id}: {e}")),
            }
        }

        outcome
    }

    async fn notify(&self, id: OrderId, status: OrderStatus) {
        if !matches!(status, OrderStatus::Shipped | OrderStatus::Delivered) {
            return;
        }
        let Some(email) = self.email else {
            tracing::info!(order_id = %id, "SMTP not configured, skipping customer notification");
            return;
        };

        let target = match OrderRepository::new(self.pool).notification_target(id).await {
            Ok(Some(target)) => target,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(order_id = %id, error = %e, "Failed to load order for notification");
                return;
            }
        };

        let result = if status == OrderStatus::Shipped {
            email.send_order_shipped(&target).await
        } else {
            email.send_order_delivered(&target).await
        };

        if let Err(e) = result {
            tracing::warn!(
                order_number = %target.order_number,
                error = %e,
                "Failed to send order notification"
            );
        }
    }
}

/// Parse the bulk form's comma-separated id list, skipping blanks.
///
/// # Errors
///
/// Returns the first entry that is not an integer.
pub fn parse_order_ids(raw: &str) -> Result<Vec<OrderId>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i32>()
                .map(OrderId::new)
                .map_err(|_| format!("Invalid order id: {s}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_actions_parse() {
        assert_eq!("mark_shipped".parse(), Ok(BulkAction::MarkShipped));
        assert_eq!(BulkAction::Cancel.target(), OrderStatus::Cancelled);
        assert!("archive".parse::<BulkAction>().is_err());
    }

    #[test]
    fn order_ids_parse_and_skip_blanks() {
        assert_eq!(
            parse_order_ids("1, 2,,3 ").unwrap(),
            vec![OrderId::new(1), OrderId::new(2), OrderId::new(3)]
        );
        assert_eq!(parse_order_ids("").unwrap(), Vec::<OrderId>::new());
        assert_eq!(parse_order_ids("4,x").unwrap_err(), "Invalid order id: x");
    }

    #[test]
    fn shipped_description_mentions_carrier_and_tracking() {
        assert_eq!(
            default_event_description(OrderStatus::Shipped, Some("1Z9"), Some("UPS")),
            "Shipped via UPS (1Z9)"
        );
        assert_eq!(
            default_event_description(OrderStatus::Shipped, None, None),
            "Shipped"
        );
        assert_eq!(
            default_event_description(OrderStatus::Cancelled, None, None),
            "Order cancelled"
        );
    }

    #[test]
    fn blank_inputs_are_dropped() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" UPS ")), Some("UPS"));
        assert_eq!(non_blank(None), None);
    }
}
