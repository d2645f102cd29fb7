//! Order placement.
//!
//! Turns the signed-in customer's cart into a pending order and a hosted
//! checkout session in a single database transaction. Product rows and the
//! coupon row are locked while stock and usage are re-checked, so two
//! customers racing for the last copy cannot both succeed. The payment
//! session is opened before commit; if that fails the whole order rolls back.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;
use uuid::Uuid;

use author_store_core::{
    CartId, CouponError, Email, EmailError, OrderId, OrderNumber, OrderStatus, OrderTotals,
    PricingPolicy, UserId, pricing::line_subtotal,
};

use crate::db::carts::{self, LockedLine};
use crate::db::coupons;
use crate::db::orders::{self, NewOrder, NewOrderItem};
use crate::models::ShippingDetails;
use crate::stripe::{CheckoutLineItem, CheckoutSessionRequest, StripeClient, StripeError};

/// Placeholder the payment provider substitutes with the session id.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Invalid email address: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{0} must be on this site")]
    ForeignRedirect(&'static str),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("{0} is no longer available")]
    ProductUnavailable(String),

    #[error("Only {available} of {name} available in stock")]
    InsufficientStock { name: String, available: i32 },

    #[error("{0}")]
    Coupon(#[from] CouponError),

    #[error("payment provider error: {0}")]
    Payment(#[from] StripeError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Checkout form as posted by the client.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
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
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

impl CheckoutForm {
    /// Check required fields and normalize the shipping details.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` for the first blank required field and
    /// `InvalidEmail` if the address does not parse.
    pub fn shipping_details(&self) -> Result<ShippingDetails, CheckoutError> {
        let required = [
            ("email", &self.email),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("address_line1", &self.address_line1),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("phone", &self.phone),
        ];
        if let Some(&(field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(CheckoutError::MissingField(field));
        }

        let email = Email::parse(&self.email)?;
        let country = match self.country.trim() {
            "" => "US".to_string(),
            other => other.to_uppercase(),
        };

        Ok(ShippingDetails {
            email: email.into_inner(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            address_line1: self.address_line1.trim().to_string(),
            address_line2: self.address_line2.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country,
            phone: self.phone.trim().to_string(),
        })
    }
}

/// Response to a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub order_number: String,
    pub checkout_url: Option<String>,
    pub session_id: String,
}

pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    stripe: &'a StripeClient,
    policy: &'a PricingPolicy,
    public_url: &'a Url,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        stripe: &'a StripeClient,
        policy: &'a PricingPolicy,
        public_url: &'a Url,
    ) -> Self {
        Self {
            pool,
            stripe,
            policy,
            public_url,
        }
    }

    /// Place an order for everything in `cart_id`.
    ///
    /// # Errors
    ///
    /// Returns a validation variant for bad input or an unfillable cart,
    /// `Payment` if the checkout session cannot be created and `Database` for
    /// storage failures. Nothing is persisted on error.
    #[instrument(skip(self, form), fields(user_id = %user_id, cart_id = %cart_id))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        cart_id: CartId,
        form: &CheckoutForm,
    ) -> Result<PlacedOrder, CheckoutError> {
        let shipping = form.shipping_details()?;
        let (success_url, cancel_url) = redirect_urls(
            self.public_url,
            form.success_url.as_deref(),
            form.cancel_url.as_deref(),
        )?;

        let mut tx = self.pool.begin().await?;

        let lines = carts::lock_lines_for_checkout(&mut tx, cart_id).await?;
        let subtotal = validate_lines(&lines)?;

        let now = Utc::now();
        let mut discount = Decimal::ZERO;
        let mut applied_coupon = None;
        if let Some(coupon_id) = carts::attached_coupon(&mut tx, cart_id).await?
            && let Some(coupon) = coupons::lock_coupon(&mut tx, coupon_id).await?
        {
            discount = coupon.rules.discount_for(subtotal, now)?;
            if !coupons::consume_use(&mut tx, coupon.id).await? {
                return Err(CouponError::UsageExhausted.into());
            }
            applied_coupon = Some(coupon);
        }

        let totals = OrderTotals::compute(subtotal, discount, self.policy);
        let order_number = OrderNumber::generate(now);
        let idempotency_key = Uuid::new_v4();

        let order_id = orders::insert_order(
            &mut tx,
            &NewOrder {
                order_number: order_number.as_str(),
                user_id,
                shipping: &shipping,
                totals,
                coupon: applied_coupon.as_ref().map(|c| (c.id, c.code.as_str())),
                idempotency_key,
            },
        )
        .await?;

        for line in &lines {
            let reserved = orders::insert_item_and_reserve_stock(
                &mut tx,
                order_id,
                &NewOrderItem {
                    product_id: line.product_id,
                    product_name: &line.product_name,
                    product_price: line.price,
                    quantity: line.quantity,
                },
            )
            .await?;
            if !reserved {
                return Err(CheckoutError::InsufficientStock {
                    name: line.product_name.clone(),
                    available: line.stock,
                });
            }
        }

        orders::add_tracking_event(&mut tx, order_id, OrderStatus::Pending, "Order placed").await?;

        let session = self
            .stripe
            .create_checkout_session(
                &CheckoutSessionRequest {
                    order_id: order_id.to_string(),
                    order_number: order_number.to_string(),
                    customer_email: shipping.email.clone(),
                    success_url,
                    cancel_url,
                    line_items: checkout_line_items(order_number.as_str(), &lines, &totals),
                },
                idempotency_key,
            )
            .await?;

        orders::set_checkout_session(&mut tx, order_id, &session.id).await?;
        carts::empty_cart(&mut tx, cart_id).await?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            order_number = %order_number,
            total = %totals.total,
            "Order placed"
        );

        Ok(PlacedOrder {
            order_id,
            order_number: order_number.to_string(),
            checkout_url: session.url,
            session_id: session.id,
        })
    }
}

/// Resolve the success and cancel URLs, defaulting to pages on the public
/// site. Supplied URLs must share its origin.
fn redirect_urls(
    public_url: &Url,
    success: Option<&str>,
    cancel: Option<&str>,
) -> Result<(String, String), CheckoutError> {
    let base = public_url.as_str().trim_end_matches('/');
    let success = match success.map(str::trim).filter(|s| !s.is_empty()) {
        Some(url) => same_origin(public_url, url, "success_url")?,
        None => format!("{base}/order/success?session_id={SESSION_ID_PLACEHOLDER}"),
    };
    let cancel = match cancel.map(str::trim).filter(|s| !s.is_empty()) {
        Some(url) => same_origin(public_url, url, "cancel_url")?,
        None => format!("{base}/order/cancel"),
    };
    Ok((success, cancel))
}

fn same_origin(public_url: &Url, candidate: &str, field: &'static str) -> Result<String, CheckoutError> {
    // The placeholder's braces are not valid in a URL until the provider fills them in.
    let parsed = Url::parse(&candidate.replace(SESSION_ID_PLACEHOLDER, "placeholder"))
        .map_err(|_| CheckoutError::ForeignRedirect(field))?;
    if parsed.origin() == public_url.origin() {
        Ok(candidate.to_string())
    } else {
        Err(CheckoutError::ForeignRedirect(field))
    }
}

/// Check every locked line can be filled and return the subtotal at current
/// prices.
fn validate_lines(lines: &[LockedLine]) -> Result<Decimal, CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    for line in lines {
        if !line.is_available {
            return Err(CheckoutError::ProductUnavailable(line.product_name.clone()));
        }
        if line.quantity > line.stock {
            return Err(CheckoutError::InsufficientStock {
                name: line.product_name.clone(),
                available: line.stock,
            });
        }
    }
    Ok(line_subtotal(lines.iter().map(|l| (l.price, l.quantity))))
}

/// Lines shown on the hosted payment page.
///
/// Negative amounts are not accepted, so a discounted order is sent as one
/// line for its total.
fn checkout_line_items(
    order_number: &str,
    lines: &[LockedLine],
    totals: &OrderTotals,
) -> Vec<CheckoutLineItem> {
    if totals.has_discount() {
        return vec![CheckoutLineItem {
            name: format!("Order {order_number}"),
            unit_amount: totals.total,
            quantity: 1,
        }];
    }

    let mut items: Vec<CheckoutLineItem> = lines
        .iter()
        .map(|line| CheckoutLineItem {
            name: line.product_name.clone(),
            unit_amount: line.price,
            quantity: line.quantity,
        })
        .collect();
    if totals.shipping_cost > Decimal::ZERO {
        items.push(CheckoutLineItem {
            name: "Shipping".to_string(),
            unit_amount: totals.shipping_cost,
            quantity: 1,
        });
    }
    if totals.tax > Decimal::ZERO {
        items.push(CheckoutLineItem {
            name: "Tax".to_string(),
            unit_amount: totals.tax,
            quantity: 1,
        });
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use author_store_core::ProductId;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn line(id: i32, price: &str, quantity: i32, stock: i32) -> LockedLine {
        LockedLine {
            product_id: ProductId::new(id),
            product_name: format!("Book {id}"),
            price: dec(price),
            stock,
            is_available: true,
            quantity,
        }
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            email: "Reader@Example.COM".to_string(),
            first_name: " Ada ".to_string(),
            last_name: "Lovelace".to_string(),
            address_line1: "1 Analytical Way".to_string(),
            city: "London".to_string(),
            state: "LDN".to_string(),
            postal_code: "N1".to_string(),
            phone: "555-0100".to_string(),
            ..CheckoutForm::default()
        }
    }

    fn site() -> Url {
        Url::parse("https://shop.example.com").unwrap()
    }

    #[test]
    fn shipping_details_default_country_and_trim() {
        let details = form().shipping_details().unwrap();
        assert_eq!(details.country, "US");
        assert_eq!(details.first_name, "Ada");
        assert_eq!(details.email, "Reader@example.com");
    }

    #[test]
    fn first_missing_field_is_reported() {
        let mut f = form();
        f.city = "  ".to_string();
        f.phone = String::new();
        assert!(matches!(
            f.shipping_details(),
            Err(CheckoutError::MissingField("city"))
        ));
    }

    #[test]
    fn bad_email_is_rejected() {
        let mut f = form();
        f.email = "not-an-email".to_string();
        assert!(matches!(
            f.shipping_details(),
            Err(CheckoutError::InvalidEmail(_))
        ));
    }

    #[test]
    fn redirects_default_to_public_site() {
        let (success, cancel) = redirect_urls(&site(), None, Some(" ")).unwrap();
        assert_eq!(
            success,
            "https://shop.example.com/order/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(cancel, "https://shop.example.com/order/cancel");
    }

    #[test]
    fn supplied_redirects_must_share_origin() {
        let ok = redirect_urls(
            &site(),
            Some("https://shop.example.com/thanks?session_id={CHECKOUT_SESSION_ID}"),
            None,
        );
        assert!(ok.is_ok());

        let foreign = redirect_urls(&site(), Some("https://evil.example.net/thanks"), None);
        assert!(matches!(
            foreign,
            Err(CheckoutError::ForeignRedirect("success_url"))
        ));

        let downgraded = redirect_urls(&site(), None, Some("http://shop.example.com/cancel"));
        assert!(matches!(
            downgraded,
            Err(CheckoutError::ForeignRedirect("cancel_url"))
        ));
    }

    #[test]
    fn lines_are_validated_against_locked_stock() {
        assert!(matches!(validate_lines(&[]), Err(CheckoutError::EmptyCart)));

        let subtotal = validate_lines(&[line(1, "10.00", 2, 5), line(2, "3.50", 1, 1)]).unwrap();
        assert_eq!(subtotal, dec("23.50"));

        let err = validate_lines(&[line(1, "10.00", 3, 2)]).unwrap_err();
        assert_eq!(err.to_string(), "Only 2 of Book 1 available in stock");

        let mut hidden = line(1, "10.00", 1, 5);
        hidden.is_available = false;
        assert!(matches!(
            validate_lines(&[hidden]),
            Err(CheckoutError::ProductUnavailable(_))
        ));
    }

    #[test]
    fn undiscounted_order_is_itemized() {
        let lines = [line(1, "10.00", 2, 5)];
        let totals = OrderTotals::compute(dec("20.00"), Decimal::ZERO, &PricingPolicy::default());
        let items = checkout_line_items("ORD-20261015-AAAAAAAA", &lines, &totals);

        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Book 1", "Shipping", "Tax"]);
        let charged: Decimal = items
            .iter()
            .map(|i| i.unit_amount * Decimal::from(i.quantity))
            .sum();
        assert_eq!(charged, totals.total);
    }

    #[test]
    fn discounted_order_is_one_line_for_the_total() {
        let lines = [line(1, "10.00", 2, 5)];
        let totals = OrderTotals::compute(dec("20.00"), dec("5.00"), &PricingPolicy::default());
        let items = checkout_line_items("ORD-20261015-AAAAAAAA", &lines, &totals);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Order ORD-20261015-AAAAAAAA");
        assert_eq!(items[0].unit_amount, totals.total);
    }
}
