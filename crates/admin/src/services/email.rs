//! Customer and staff notifications sent from the admin panel.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and text templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::db::orders::NotificationTarget;
use crate::filters;
use crate::models::StockAlert;

#[derive(Template)]
#[template(path = "email/order_shipped.html")]
struct OrderShippedHtml<'a> {
    order: &'a NotificationTarget,
    orders_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_shipped.txt")]
struct OrderShippedText<'a> {
    order: &'a NotificationTarget,
    orders_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_delivered.html")]
struct OrderDeliveredHtml<'a> {
    order: &'a NotificationTarget,
    orders_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_delivered.txt")]
struct OrderDeliveredText<'a> {
    order: &'a NotificationTarget,
    orders_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/low_stock_alert.html")]
struct LowStockAlertHtml<'a> {
    products: &'a [StockAlert],
    inventory_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/low_stock_alert.txt")]
struct LowStockAlertText<'a> {
    products: &'a [StockAlert],
    inventory_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered message: subject, text body, HTML body.
type Rendered = (String, String, String);

#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    orders_url: String,
    inventory_url: String,
}

impl EmailService {
    /// Create an SMTP-backed email service.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured.
    pub fn new(
        config: &EmailConfig,
        storefront_url: &url::Url,
        admin_url: &url::Url,
    ) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            orders_url: join_url(storefront_url, "/account/orders"),
            inventory_url: join_url(admin_url, "/inventory"),
        })
    }

    /// # Errors
    ///
    /// Returns error if the template fails to render or delivery fails.
    pub async fn send_order_shipped(&self, order: &NotificationTarget) -> Result<(), EmailError> {
        let (subject, text, html) = render_order_shipped(order, &self.orders_url)?;
        self.send_multipart_email(&order.email, &subject, &text, &html)
            .await
    }

    /// # Errors
    ///
    /// Returns error if the template fails to render or delivery fails.
    pub async fn send_order_delivered(&self, order: &NotificationTarget) -> Result<(), EmailError> {
        let (subject, text, html) = render_order_delivered(order, &self.orders_url)?;
        self.send_multipart_email(&order.email, &subject, &text, &html)
            .await
    }

    /// # Errors
    ///
    /// Returns error if the template fails to render or delivery fails.
    pub async fn send_low_stock_alert(
        &self,
        to: &str,
        products: &[StockAlert],
    ) -> Result<(), EmailError> {
        let (subject, text, html) = render_low_stock_alert(products, &self.inventory_url)?;
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

fn join_url(base: &url::Url, path: &str) -> String {
    format!("{}{path}", base.as_str().trim_end_matches('/'))
}

fn render_order_shipped(order: &NotificationTarget, orders_url: &str) -> Result<Rendered, EmailError> {
    let subject = format!("Your Order Has Shipped - {}", order.order_number);
    let text = OrderShippedText { order, orders_url }.render()?;
    let html = OrderShippedHtml { order, orders_url }.render()?;
    Ok((subject, text, html))
}

fn render_order_delivered(order: &NotificationTarget, orders_url: &str) -> Result<Rendered, EmailError> {
    let subject = format!("Your Order Has Been Delivered - {}", order.order_number);
    let text = OrderDeliveredText { order, orders_url }.render()?;
    let html = OrderDeliveredHtml { order, orders_url }.render()?;
    Ok((subject, text, html))
}

fn render_low_stock_alert(products: &[StockAlert], inventory_url: &str) -> Result<Rendered, EmailError> {
    let subject = format!("Low Stock Alert - {} product(s)", products.len());
    let text = LowStockAlertText {
        products,
        inventory_url,
    }
    .render()?;
    let html = LowStockAlertHtml {
        products,
        inventory_url,
    }
    .render()?;
    Ok((subject, text, html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use author_store_core::ProductId;

    fn target(tracking: Option<&str>, carrier: Option<&str>) -> NotificationTarget {
        NotificationTarget {
            order_number: "ORD-20261015-ABCDEF12".to_string(),
            email: "reader@example.com".to_string(),
            first_name: "Ada".to_string(),
            tracking_number: tracking.map(String::from),
            carrier: carrier.map(String::from),
        }
    }

    #[test]
    fn shipped_email_includes_tracking_details() {
        let (subject, text, html) = render_order_shipped(
            &target(Some("1Z999"), Some("UPS")),
            "https://shop.example.com/account/orders",
        )
        .unwrap();

        assert_eq!(subject, "Your Order Has Shipped - ORD-20261015-ABCDEF12");
        assert!(text.contains("Carrier: UPS"));
        assert!(text.contains("Tracking number: 1Z999"));
        assert!(html.contains("1Z999"));
    }

    #[test]
    fn shipped_email_without_tracking_omits_the_lines() {
        let (_, text, _) =
            render_order_shipped(&target(None, None), "https://shop.example.com").unwrap();
        assert!(!text.contains("Tracking number"));
        assert!(!text.contains("Carrier"));
    }

    #[test]
    fn delivered_subject() {
        let (subject, text, _) =
            render_order_delivered(&target(None, None), "https://shop.example.com").unwrap();
        assert_eq!(subject, "Your Order Has Been Delivered - ORD-20261015-ABCDEF12");
        assert!(text.contains("Hi Ada"));
    }

    #[test]
    fn low_stock_alert_lists_products() {
        let products = vec![StockAlert {
            id: ProductId::new(7),
            name: "The Long Road".to_string(),
            slug: "the-long-road".to_string(),
            stock: 2,
            low_stock_threshold: 5,
            is_available: true,
        }];
        let (subject, text, _) =
            render_low_stock_alert(&products, "https://admin.example.com/inventory").unwrap();

        assert_eq!(subject, "Low Stock Alert - 1 product(s)");
        assert!(text.contains("The Long Road: 2 left (threshold 5)"));
    }

    #[test]
    fn join_url_handles_trailing_slash() {
        let base = url::Url::parse("https://shop.example.com/").unwrap();
        assert_eq!(join_url(&base, "/account/orders"), "https://shop.example.com/account/orders");
    }
}
