//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{CatalogRepository, RepositoryError};
use crate::models::Category;
use crate::services::EmailService;
use crate::stripe::StripeClient;

/// How long the category list is served from memory.
const CATEGORY_CACHE_TTL: Duration = Duration::from_secs(60);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    stripe: StripeClient,
    email: Option<EmailService>,
    categories: Cache<(), Arc<Vec<Category>>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// `email` is `None` when SMTP is not configured; mail is then skipped.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        pool: PgPool,
        stripe: StripeClient,
        email: Option<EmailService>,
    ) -> Self {
        let categories = Cache::builder()
            .max_capacity(1)
            .time_to_live(CATEGORY_CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                stripe,
                email,
                categories,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// All categories, served from a short-lived in-memory cache.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the categories have to be loaded and the
    /// query fails.
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, RepositoryError> {
        if let Some(cached) = self.inner.categories.get(&()).await {
            tracing::debug!("Cache hit for categories");
            return Ok(cached);
        }

        let categories = Arc::new(CatalogRepository::new(self.pool()).list_categories().await?);
        self.inner
            .categories
            .insert((), Arc::clone(&categories))
            .await;
        Ok(categories)
    }
}
