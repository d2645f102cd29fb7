//! Category and product queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use author_store_core::{CategoryId, ProductId};

use super::RepositoryError;
use crate::models::{Category, Product};

/// Product columns plus the approved-review summary. Callers append their own
/// `WHERE`/`ORDER BY` clauses.
pub(crate) const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.category_id, c.name AS category_name, p.name, p.slug, p.description,
           p.price, p.stock, p.is_available, p.low_stock_threshold, p.image_url,
           p.created_at, p.updated_at,
           r.average_rating, r.review_count
    FROM store.product p
    JOIN store.category c ON c.id = p.category_id
    CROSS JOIN LATERAL (
        SELECT ROUND(AVG(pr.rating), 1) AS average_rating, COUNT(*) AS review_count
        FROM store.product_review pr
        WHERE pr.product_id = p.id AND pr.is_approved
    ) r";

#[derive(sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: ProductId,
    category_id: CategoryId,
    category_name: String,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    stock: i32,
    is_available: bool,
    low_stock_threshold: i32,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    average_rating: Option<Decimal>,
    review_count: i64,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            category_name: row.category_name,
            name: row.name,
            slug: row.slug,
            description: row.description,
            price: row.price,
            stock: row.stock,
            is_available: row.is_available,
            low_stock_threshold: row.low_stock_threshold,
            image_url: row.image_url,
            average_rating: row.average_rating,
            review_count: row.review_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
    description: String,
    product_count: i64,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            product_count: row.product_count,
            created_at: row.created_at,
        }
    }
}

const CATEGORY_SELECT: &str = r"
    SELECT c.id, c.name, c.slug, c.description, c.created_at,
           COUNT(p.id) FILTER (WHERE p.is_available) AS product_count
    FROM store.category c
    LEFT JOIN store.product p ON p.category_id = c.id";

/// Sort orders accepted by the product listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum ProductOrdering {
    #[serde(rename = "price")]
    PriceAsc,
    #[serde(rename = "-price")]
    PriceDesc,
    #[serde(rename = "name")]
    NameAsc,
    #[serde(rename = "-name")]
    NameDesc,
    #[serde(rename = "created_at")]
    Oldest,
    #[default]
    #[serde(rename = "-created_at")]
    Newest,
}

impl ProductOrdering {
    const fn sql(self) -> &'static str {
        match self {
            Self::PriceAsc => " ORDER BY p.price ASC, p.id ASC",
            Self::PriceDesc => " ORDER BY p.price DESC, p.id ASC",
            Self::NameAsc => " ORDER BY p.name ASC",
            Self::NameDesc => " ORDER BY p.name DESC",
            Self::Oldest => " ORDER BY p.created_at ASC",
            Self::Newest => " ORDER BY p.created_at DESC",
        }
    }
}

/// Catalog listing filters. Only available products are ever listed.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_slug: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock_only: bool,
    pub ordering: ProductOrdering,
}

impl ProductFilter {
    fn apply(&self, query: &mut QueryBuilder<'_, Postgres>) {
        query.push(" WHERE p.is_available");
        if let Some(slug) = &self.category_slug {
            query.push(" AND c.slug = ").push_bind(slug.clone());
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", escape_like(term));
            query
                .push(" AND (p.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(min) = self.min_price {
            query.push(" AND p.price >= ").push_bind(min);
        }
        if let Some(max) = self.max_price {
            query.push(" AND p.price <= ").push_bind(max);
        }
        if self.in_stock_only {
            query.push(" AND p.stock > 0");
        }
        query.push(self.ordering.sql());
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            "{CATEGORY_SELECT} GROUP BY c.id ORDER BY c.name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "{CATEGORY_SELECT} WHERE c.slug = $1 GROUP BY c.id"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Category::from))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        filter.apply(&mut query);

        let rows = query
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Any product by slug, available or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.slug = $1"))
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Product::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50% off_now"), "50\\% off\\_now");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn filter_builds_expected_clauses() {
        let filter = ProductFilter {
            category_slug: Some("fiction".to_string()),
            search: Some("  dragon ".to_string()),
            min_price: Some(Decimal::ONE),
            max_price: None,
            in_stock_only: true,
            ordering: ProductOrdering::PriceDesc,
        };
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM store.product p");
        filter.apply(&mut query);
        let sql = query.sql();

        assert!(sql.contains("p.is_available"));
        assert!(sql.contains("c.slug = $1"));
        assert!(sql.contains("p.name ILIKE $2 OR p.description ILIKE $3"));
        assert!(sql.contains("p.price >= $4"));
        assert!(!sql.contains("p.price <="));
        assert!(sql.contains("p.stock > 0"));
        assert!(sql.ends_with("ORDER BY p.price DESC, p.id ASC"));
    }

    #[test]
    fn blank_search_is_ignored() {
        let filter = ProductFilter {
            search: Some("   ".to_string()),
            ..ProductFilter::default()
        };
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1");
        filter.apply(&mut query);
        assert!(!query.sql().contains("ILIKE"));
        assert!(query.sql().ends_with("ORDER BY p.created_at DESC"));
    }

    #[test]
    fn ordering_parses_api_values() {
        let parsed: ProductOrdering = serde_json::from_str("\"-price\"").unwrap_or_default();
        assert_eq!(parsed, ProductOrdering::PriceDesc);
        assert!(serde_json::from_str::<ProductOrdering>("\"stock\"").is_err());
    }
}
