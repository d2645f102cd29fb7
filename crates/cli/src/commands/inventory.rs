//! Inventory maintenance.
//!
//! ```bash
//! store-cli inventory check                # report and hide sold-out products
//! store-cli inventory check --send-email   # also email the low-stock report
//! store-cli inventory check --dry-run      # report only
//! ```
//!
//! Reads the same environment as the admin panel (`ADMIN_DATABASE_URL`,
//! `STORE_ALERT_EMAIL`, `SMTP_*`, `EMAIL_FROM`).

use thiserror::Error;

use author_store_admin::config::{AdminConfig, ConfigError};
use author_store_admin::db::{self, AnalyticsRepository, RepositoryError};
use author_store_admin::models::StockAlert;
use author_store_admin::services::{EmailError, EmailService};

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("--send-email needs {0} to be set")]
    EmailNotConfigured(&'static str),

    #[error("Failed to configure SMTP transport: {0}")]
    Smtp(String),

    #[error(transparent)]
    Email(#[from] EmailError),
}

/// Out-of-stock products that are still listed for sale.
fn still_listed(products: Vec<StockAlert>) -> Vec<StockAlert> {
    products.into_iter().filter(|p| p.is_available).collect()
}

fn log_products(heading: &str, products: &[StockAlert]) {
    tracing::info!("{heading}: {}", products.len());
    for product in products {
        tracing::info!(
            "  {} ({}): {} left, threshold {}",
            product.name,
            product.slug,
            product.stock,
            product.low_stock_threshold
        );
    }
}

/// Report low stock, hide sold-out products and optionally email the report.
///
/// # Errors
///
/// Returns `InventoryError` if configuration is incomplete, a query fails or
/// the alert cannot be sent.
pub async fn check(send_email: bool, dry_run: bool) -> Result<(), InventoryError> {
    let config = AdminConfig::from_env()?;

    // Fail before touching the database when the alert cannot be delivered
    let mailer = if send_email && !dry_run {
        let recipient = config
            .alert_email
            .clone()
            .ok_or(InventoryError::EmailNotConfigured("STORE_ALERT_EMAIL"))?;
        let email_config = config
            .email
            .as_ref()
            .ok_or(InventoryError::EmailNotConfigured("SMTP_HOST"))?;
        let service = EmailService::new(email_config, &config.storefront_url, &config.base_url)
            .map_err(|e| InventoryError::Smtp(e.to_string()))?;
        Some((service, recipient))
    } else {
        None
    };

    let pool = db::create_pool(&config.database_url).await?;
    let analytics = AnalyticsRepository::new(&pool);

    let low_stock = analytics.low_stock().await?;
    log_products("Low stock", &low_stock);

    if dry_run {
        let listed = still_listed(analytics.out_of_stock().await?);
        log_products("Would hide (dry run)", &listed);
    } else {
        let hidden = analytics.disable_out_of_stock().await?;
        log_products("Hidden (out of stock)", &hidden);
    }

    match mailer {
        Some((_, _)) if low_stock.is_empty() => {
            tracing::info!("Nothing is low on stock; no alert sent");
        }
        Some((service, recipient)) => {
            service
                .send_low_stock_alert(recipient.as_str(), &low_stock)
                .await?;
            tracing::info!(to = %recipient, "Low stock alert sent");
        }
        None if send_email => tracing::info!("Dry run; alert not sent"),
        None => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use author_store_core::ProductId;

    use super::*;

    fn alert(id: i32, is_available: bool) -> StockAlert {
        StockAlert {
            id: ProductId::new(id),
            name: format!("Book {id}"),
            slug: format!("book-{id}"),
            stock: 0,
            low_stock_threshold: 5,
            is_available,
        }
    }

    #[test]
    fn only_listed_products_would_be_hidden() {
        let listed = still_listed(vec![alert(1, true), alert(2, false), alert(3, true)]);
        let ids: Vec<_> = listed.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![ProductId::new(1), ProductId::new(3)]);
    }
}
