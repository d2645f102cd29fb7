//! Order and payment status rules shared by the storefront webhook handler
//! and the admin fulfillment actions.
//!
//! These tests need no running services.

use author_store_admin::services::BulkAction;
use author_store_admin::services::fulfillment::parse_order_ids;
use author_store_core::{OrderId, OrderStatus, PaymentStatus};

#[test]
fn fulfillment_path_is_linear() {
    let mut status = OrderStatus::Pending;
    for next in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        status = status.transition_to(next).unwrap();
    }
    assert!(status.is_terminal());
    assert!(status.transition_to(OrderStatus::Cancelled).is_err());
}

#[test]
fn shipped_orders_cannot_be_cancelled() {
    assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
    assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
    assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
}

#[test]
fn payment_retries_and_refunds() {
    assert!(PaymentStatus::Failed.can_transition_to(PaymentStatus::Completed));
    assert!(PaymentStatus::Completed.can_transition_to(PaymentStatus::Refunded));
    assert!(!PaymentStatus::Refunded.can_transition_to(PaymentStatus::Completed));
    assert!(!PaymentStatus::Pending.can_transition_to(PaymentStatus::Refunded));
}

#[test]
fn bulk_actions_map_to_statuses() {
    let cases = [
        ("mark_processing", OrderStatus::Processing),
        ("mark_shipped", OrderStatus::Shipped),
        ("mark_delivered", OrderStatus::Delivered),
        ("cancel", OrderStatus::Cancelled),
    ];
    for (raw, status) in cases {
        let action: BulkAction = raw.parse().unwrap();
        assert_eq!(action.target(), status, "{raw}");
    }
    assert!("refund".parse::<BulkAction>().is_err());
}

#[test]
fn bulk_order_ids_are_parsed() {
    assert_eq!(
        parse_order_ids(" 3, 1 ,2 ").unwrap(),
        vec![OrderId::new(3), OrderId::new(1), OrderId::new(2)]
    );
    assert!(parse_order_ids("3,x").is_err());
}
