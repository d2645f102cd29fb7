//! Applying payment provider webhook events to orders.
//!
//! Each event is applied in its own transaction together with the record that
//! it was seen, so a replayed delivery is a no-op and a failed attempt leaves
//! nothing behind for the provider's retry to trip over.

use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use tracing::{info, instrument, warn};

use author_store_core::{OrderId, OrderStatus, PaymentStatus};

use crate::db::orders::{self, OrderState};
use crate::db::{OrderRepository, RepositoryError, coupons, webhook_events};
use crate::services::email::EmailService;
use crate::stripe::{ChargeObject, CheckoutSessionObject, StripeEvent};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("invalid event object: {0}")]
    InvalidObject(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// What happened to a delivered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    /// Already processed in an earlier delivery.
    Duplicate,
    /// Acknowledged without changing anything.
    Ignored,
}

pub struct PaymentService<'a> {
    pool: &'a PgPool,
    email: Option<&'a EmailService>,
}

impl<'a> PaymentService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: Option<&'a EmailService>) -> Self {
        Self { pool, email }
    }

    /// Apply a verified event.
    ///
    /// # Errors
    ///
    /// Returns `InvalidObject` if the event body does not have the shape its
    /// type promises, and `Database` for storage failures. Transition
    /// conflicts are logged and reported as [`EventOutcome::Ignored`].
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn handle_event(&self, event: &StripeEvent) -> Result<EventOutcome, PaymentError> {
        let mut tx = self.pool.begin().await?;

        if !webhook_events::record_event(&mut tx, &event.id, &event.event_type).await? {
            info!("Duplicate webhook event");
            return Ok(EventOutcome::Duplicate);
        }

        let mut confirmed = None;
        let outcome = match event.event_type.as_str() {
            "checkout.session.completed" => {
                let session: CheckoutSessionObject = event.object()?;
                if session.payment_status.as_deref() == Some("paid") {
                    confirmed = mark_paid(&mut tx, &session).await?;
                    applied(confirmed.is_some())
                } else {
                    info!(session_id = %session.id, "Checkout completed, payment still pending");
                    EventOutcome::Ignored
                }
            }
            "checkout.session.async_payment_succeeded" => {
                let session: CheckoutSessionObject = event.object()?;
                confirmed = mark_paid(&mut tx, &session).await?;
                applied(confirmed.is_some())
            }
            "checkout.session.async_payment_failed" => {
                let session: CheckoutSessionObject = event.object()?;
                applied(mark_failed(&mut tx, &session).await?)
            }
            "checkout.session.expired" => {
                let session: CheckoutSessionObject = event.object()?;
                applied(expire(&mut tx, &session).await?)
            }
            "charge.refunded" => {
                let charge: ChargeObject = event.object()?;
                applied(mark_refunded(&mut tx, &charge).await?)
            }
            other => {
                info!(event_type = %other, "Unhandled webhook event type");
                EventOutcome::Ignored
            }
        };

        tx.commit().await?;

        if let Some(order_id) = confirmed {
            self.send_confirmation(order_id).await;
        }

        Ok(outcome)
    }

    async fn send_confirmation(&self, order_id: OrderId) {
        let Some(email) = self.email else {
            info!(order_id = %order_id, "SMTP not configured, skipping confirmation email");
            return;
        };
        match OrderRepository::new(self.pool).get(order_id).await {
            Ok(Some(order)) => {
                if let Err(e) = email.send_order_confirmation(&order).await {
                    tracing::error!(order_id = %order_id, error = %e, "Failed to send confirmation email");
                }
            }
            Ok(None) => warn!(order_id = %order_id, "Paid order disappeared before email"),
            Err(e) => tracing::error!(order_id = %order_id, error = %e, "Failed to load order for email"),
        }
    }
}

const fn applied(changed: bool) -> EventOutcome {
    if changed {
        EventOutcome::Applied
    } else {
        EventOutcome::Ignored
    }
}

/// Find the order behind a checkout session, by session id first and then by
/// the order id carried in metadata.
async fn lock_session_order(
    conn: &mut PgConnection,
    session: &CheckoutSessionObject,
) -> Result<Option<OrderState>, sqlx::Error> {
    if let Some(state) = orders::lock_by_checkout_session(conn, &session.id).await? {
        return Ok(Some(state));
    }
    match session.order_id().and_then(|id| id.parse::<OrderId>().ok()) {
        Some(id) => orders::lock_by_id(conn, id).await,
        None => Ok(None),
    }
}

/// Returns the order id if payment was newly recorded.
async fn mark_paid(
    conn: &mut PgConnection,
    session: &CheckoutSessionObject,
) -> Result<Option<OrderId>, sqlx::Error> {
    let Some(state) = lock_session_order(conn, session).await? else {
        warn!(session_id = %session.id, "No order for checkout session");
        return Ok(None);
    };
    if state.payment_status == PaymentStatus::Completed {
        info!(order_number = %state.order_number, "Payment already recorded");
        return Ok(None);
    }
    if let Err(e) = state.payment_status.transition_to(PaymentStatus::Completed) {
        warn!(order_number = %state.order_number, error = %e, "Ignoring payment event");
        return Ok(None);
    }

    orders::set_payment_status(
        conn,
        state.id,
        PaymentStatus::Completed,
        session.payment_intent.as_deref(),
    )
    .await?;

    if state.status.can_transition_to(OrderStatus::Processing) {
        orders::set_order_status(conn, state.id, OrderStatus::Processing).await?;
        orders::add_tracking_event(
            conn,
            state.id,
            OrderStatus::Processing,
            "Payment received, preparing your order",
        )
        .await?;
    } else {
        warn!(
            order_number = %state.order_number,
            status = %state.status,
            "Payment completed for an order that cannot be processed"
        );
    }

    info!(order_number = %state.order_number, "Payment completed");
    Ok(Some(state.id))
}

async fn mark_failed(
    conn: &mut PgConnection,
    session: &CheckoutSessionObject,
) -> Result<bool, sqlx::Error> {
    let Some(state) = lock_session_order(conn, session).await? else {
        warn!(session_id = %session.id, "No order for checkout session");
        return Ok(false);
    };
    if let Err(e) = state.payment_status.transition_to(PaymentStatus::Failed) {
        warn!(order_number = %state.order_number, error = %e, "Ignoring payment failure");
        return Ok(false);
    }

    orders::set_payment_status(conn, state.id, PaymentStatus::Failed, None).await?;
    info!(order_number = %state.order_number, "Payment failed");
    Ok(true)
}

/// Cancel an order whose checkout session lapsed unpaid and give back what it
/// reserved.
async fn expire(
    conn: &mut PgConnection,
    session: &CheckoutSessionObject,
) -> Result<bool, sqlx::Error> {
    let Some(state) = lock_session_order(conn, session).await? else {
        warn!(session_id = %session.id, "No order for checkout session");
        return Ok(false);
    };
    if state.status != OrderStatus::Pending || state.payment_status != PaymentStatus::Pending {
        info!(
            order_number = %state.order_number,
            status = %state.status,
            payment_status = %state.payment_status,
            "Expired session for an order that moved on"
        );
        return Ok(false);
    }

    orders::set_order_status(conn, state.id, OrderStatus::Cancelled).await?;
    orders::set_payment_status(conn, state.id, PaymentStatus::Failed, None).await?;
    orders::restock_items(conn, state.id).await?;
    if let Some(coupon_id) = state.coupon_id {
        coupons::release_use(conn, coupon_id).await?;
    }
    orders::add_tracking_event(
        conn,
        state.id,
        OrderStatus::Cancelled,
        "Checkout expired before payment",
    )
    .await?;

    info!(order_number = %state.order_number, "Order cancelled after checkout expired");
    Ok(true)
}

async fn mark_refunded(conn: &mut PgConnection, charge: &ChargeObject) -> Result<bool, sqlx::Error> {
    let Some(intent) = charge.payment_intent.as_deref() else {
        warn!(charge_id = %charge.id, "Refunded charge has no payment intent");
        return Ok(false);
    };
    let Some(state) = orders::lock_by_payment_intent(conn, intent).await? else {
        warn!(payment_intent = %intent, "No order for refunded payment intent");
        return Ok(false);
    };
    if let Err(e) = state.payment_status.transition_to(PaymentStatus::Refunded) {
        warn!(order_number = %state.order_number, error = %e, "Ignoring refund");
        return Ok(false);
    }

    orders::set_payment_status(conn, state.id, PaymentStatus::Refunded, None).await?;
    info!(order_number = %state.order_number, "Payment refunded");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_events_are_ignored() {
        assert_eq!(applied(true), EventOutcome::Applied);
        assert_eq!(applied(false), EventOutcome::Ignored);
    }
}
