//! Product and category maintenance.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use author_store_core::{CategoryId, ProductId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Category, Product};

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
    updated_at: DateTime<Utc>,
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
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            product_count: row.product_count,
        }
    }
}

pub(crate) const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.category_id, c.name AS category_name, p.name, p.slug, p.description,
           p.price, p.stock, p.is_available, p.low_stock_threshold, p.image_url, p.updated_at
    FROM store.product p
    JOIN store.category c ON c.id = p.category_id";

/// Fields staff can set on a product.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub category_id: CategoryId,
    pub name: String,
    /// Generated from the name when blank.
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_available: bool,
    pub low_stock_threshold: i32,
    pub image_url: Option<String>,
}

impl ProductInput {
    /// Trim fields and check ranges the database would otherwise reject.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn normalize(mut self) -> Result<Self, String> {
        self.name = self.name.trim().to_owned();
        if self.name.is_empty() {
            return Err("Name is required".to_owned());
        }
        self.slug = if self.slug.trim().is_empty() {
            slugify(&self.name)
        } else {
            slugify(&self.slug)
        };
        if self.slug.is_empty() {
            return Err("Slug must contain letters or digits".to_owned());
        }
        if self.price < Decimal::ZERO {
            return Err("Price cannot be negative".to_owned());
        }
        if self.stock < 0 {
            return Err("Stock cannot be negative".to_owned());
        }
        if self.low_stock_threshold < 0 {
            return Err("Low stock threshold cannot be negative".to_owned());
        }
        self.image_url = self
            .image_url
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty());
        Ok(self)
    }
}

/// The inline edit on the product list.
#[derive(Debug, Clone, Copy)]
pub struct QuickUpdate {
    pub price: Decimal,
    pub stock: i32,
    pub is_available: bool,
}

/// Lowercase ASCII slug: alphanumeric runs joined by single hyphens.
///
/// ```
/// use author_store_admin::db::catalog::slugify;
///
/// assert_eq!(slugify("  Sci-Fi & Fantasy! "), "sci-fi-fantasy");
/// ```
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every product, available or not, optionally narrowed by a name search.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_products(&self, search: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let term = search.map(str::trim).filter(|t| !t.is_empty());
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} WHERE ($1::TEXT IS NULL OR p.name ILIKE '%' || $1 || '%') \
             ORDER BY p.name"
        ))
        .bind(term)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
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

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create_product(&self, input: &ProductInput) -> Result<ProductId, RepositoryError> {
        sqlx::query_scalar::<_, ProductId>(
            "INSERT INTO store.product \
                 (category_id, name, slug, description, price, stock, is_available, \
                  low_stock_threshold, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id",
        )
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.stock)
        .bind(input.is_available)
        .bind(input.low_stock_threshold)
        .bind(input.image_url.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A product with this slug already exists"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, or
    /// `RepositoryError::Conflict` if the slug is taken.
    pub async fn update_product(&self, id: ProductId, input: &ProductInput) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE store.product SET \
                 category_id = $2, name = $3, slug = $4, description = $5, price = $6, \
                 stock = $7, is_available = $8, low_stock_threshold = $9, image_url = $10, \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.stock)
        .bind(input.is_available)
        .bind(input.low_stock_threshold)
        .bind(input.image_url.as_deref())
        .execute(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A product with this slug already exists"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn quick_update(&self, id: ProductId, update: QuickUpdate) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE store.product SET price = $2, stock = $3, is_available = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(update.price)
        .bind(update.stock)
        .bind(update.is_available)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Insert or update a product keyed by slug. Returns `true` when inserted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_product(&self, input: &ProductInput) -> Result<bool, RepositoryError> {
        let inserted = sqlx::query_scalar::<_, bool>(
            "INSERT INTO store.product \
                 (category_id, name, slug, description, price, stock, is_available, \
                  low_stock_threshold, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (slug) DO UPDATE SET \
                 category_id = EXCLUDED.category_id, name = EXCLUDED.name, \
                 description = EXCLUDED.description, price = EXCLUDED.price, \
                 stock = EXCLUDED.stock, is_available = EXCLUDED.is_available, \
                 low_stock_threshold = EXCLUDED.low_stock_threshold, \
                 image_url = EXCLUDED.image_url, updated_at = NOW() \
             RETURNING (xmax = 0)",
        )
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.stock)
        .bind(input.is_available)
        .bind(input.low_stock_threshold)
        .bind(input.image_url.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(inserted)
    }

    /// All categories with their product counts, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT c.id, c.name, c.slug, c.description, COUNT(p.id) AS product_count \
             FROM store.category c \
             LEFT JOIN store.product p ON p.category_id = c.id \
             GROUP BY c.id ORDER BY c.name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// Create a category. A blank slug is generated from the name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or slug is taken.
    pub async fn create_category(
        &self,
        name: &str,
        slug: &str,
        description: &str,
    ) -> Result<CategoryId, RepositoryError> {
        let slug = if slug.trim().is_empty() { slugify(name) } else { slugify(slug) };
        sqlx::query_scalar::<_, CategoryId>(
            "INSERT INTO store.category (name, slug, description) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name.trim())
        .bind(slug)
        .bind(description.trim())
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A category with this name or slug already exists"))
    }

    /// Insert or update a category keyed by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_category(
        &self,
        name: &str,
        slug: &str,
        description: &str,
    ) -> Result<CategoryId, RepositoryError> {
        Ok(sqlx::query_scalar::<_, CategoryId>(
            "INSERT INTO store.category (name, slug, description) VALUES ($1, $2, $3) \
             ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name, description = EXCLUDED.description \
             RETURNING id",
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .fetch_one(self.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, slug: &str) -> ProductInput {
        ProductInput {
            category_id: CategoryId::new(1),
            name: name.to_string(),
            slug: slug.to_string(),
            description: String::new(),
            price: Decimal::new(1250, 2),
            stock: 4,
            is_available: true,
            low_stock_threshold: 5,
            image_url: Some("  ".to_string()),
        }
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("The Long Road"), "the-long-road");
        assert_eq!(slugify("--Hello,   World--"), "hello-world");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn normalize_fills_slug_and_drops_blank_image() {
        let product = input("  Night Garden ", "")
            .normalize()
            .expect("valid product");
        assert_eq!(product.name, "Night Garden");
        assert_eq!(product.slug, "night-garden");
        assert_eq!(product.image_url, None);
    }

    #[test]
    fn normalize_rejects_bad_values() {
        assert!(input("", "x").normalize().is_err());
        assert!(input("Name", "???").normalize().is_err());

        let mut negative = input("Name", "");
        negative.stock = -1;
        assert_eq!(negative.normalize().unwrap_err(), "Stock cannot be negative");
    }
}
