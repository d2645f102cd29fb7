//! Seed the catalog from a YAML file.
//!
//! Categories and products are matched by slug, so the same file can be
//! loaded repeatedly to update prices and stock.
//!
//! ```yaml
//! categories:
//!   - name: Fiction
//!     description: Novels and short stories
//!     products:
//!       - name: The Long Road
//!         price: "14.99"
//!         stock: 25
//!       - name: Winter Letters
//!         slug: winter-letters-hardcover
//!         price: "24.00"
//!         stock: 3
//!         low_stock_threshold: 2
//!         is_available: false
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use author_store_admin::db::catalog::{ProductInput, slugify};
use author_store_admin::db::{self, CatalogRepository};
use author_store_core::CategoryId;

use super::database_url;

const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    pub categories: Vec<CategorySeed>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategorySeed {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductSeed {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default = "default_threshold")]
    pub low_stock_threshold: i32,
    #[serde(default)]
    pub image_url: Option<String>,
}

const fn default_available() -> bool {
    true
}

const fn default_threshold() -> i32 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

impl CategorySeed {
    fn slug(&self) -> String {
        slugify(self.slug.as_deref().unwrap_or(&self.name))
    }
}

impl ProductSeed {
    fn to_input(&self, category_id: CategoryId) -> Result<ProductInput, String> {
        ProductInput {
            category_id,
            name: self.name.clone(),
            slug: self.slug.clone().unwrap_or_default(),
            description: self.description.clone(),
            price: self.price,
            stock: self.stock,
            is_available: self.is_available,
            low_stock_threshold: self.low_stock_threshold,
            image_url: self.image_url.clone(),
        }
        .normalize()
        .map_err(|e| format!("{}: {e}", self.name))
    }
}

/// Every problem in the file, so they can all be fixed in one pass.
fn validate(catalog: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut category_slugs = std::collections::HashSet::new();
    let mut product_slugs = std::collections::HashSet::new();

    for category in &catalog.categories {
        let slug = category.slug();
        if slug.is_empty() {
            errors.push(format!("category {:?}: slug must contain letters or digits", category.name));
        } else if !category_slugs.insert(slug.clone()) {
            errors.push(format!("category slug {slug:?} appears more than once"));
        }

        for product in &category.products {
            // Placeholder id; only field validation happens here
            match product.to_input(CategoryId::new(0)) {
                Ok(input) => {
                    if !product_slugs.insert(input.slug.clone()) {
                        errors.push(format!("product slug {:?} appears more than once", input.slug));
                    }
                }
                Err(e) => errors.push(e),
            }
        }
    }
    errors
}

/// Seed categories and products from a YAML file.
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or a database write fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;

    // Validate before connecting to the database
    let errors = validate(&catalog);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = db::create_pool(&database_url("ADMIN_DATABASE_URL")?).await?;
    let repo = CatalogRepository::new(&pool);

    let (mut inserted, mut updated) = (0_usize, 0_usize);
    for category in &catalog.categories {
        let category_id = repo
            .upsert_category(category.name.trim(), &category.slug(), category.description.trim())
            .await?;

        for product in &category.products {
            let input = product.to_input(category_id)?;
            if repo.upsert_product(&input).await? {
                inserted += 1;
            } else {
                updated += 1;
            }
        }
    }

    info!("Seeding complete!");
    info!("  Categories: {}", catalog.categories.len());
    info!("  Products inserted: {inserted}");
    info!("  Products updated: {updated}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
categories:
  - name: Sci-Fi & Fantasy
    products:
      - name: The Long Road
        price: "14.99"
        stock: 25
      - name: Winter Letters
        slug: Winter Letters (Hardcover)
        price: "24.00"
        stock: 3
        low_stock_threshold: 2
        is_available: false
"#;

    #[test]
    fn parses_and_applies_defaults() {
        let catalog: CatalogFile = serde_yaml::from_str(SAMPLE).unwrap();
        let category = &catalog.categories[0];
        assert_eq!(category.slug(), "sci-fi-fantasy");

        let first = category.products[0].to_input(CategoryId::new(7)).unwrap();
        assert_eq!(first.slug, "the-long-road");
        assert_eq!(first.price, Decimal::new(1499, 2));
        assert!(first.is_available);
        assert_eq!(first.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);

        let second = category.products[1].to_input(CategoryId::new(7)).unwrap();
        assert_eq!(second.slug, "winter-letters-hardcover");
        assert!(!second.is_available);

        assert!(validate(&catalog).is_empty());
    }

    #[test]
    fn reports_every_problem() {
        let yaml = r#"
categories:
  - name: Poetry
    products:
      - name: Verses
        price: "-1"
        stock: 2
      - name: Verses
        price: "5"
        stock: 2
      - name: "  "
        price: "5"
        stock: 1
  - name: poetry
"#;
        let catalog: CatalogFile = serde_yaml::from_str(yaml).unwrap();
        let errors = validate(&catalog);
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors[0].contains("Price cannot be negative"));
        assert!(errors[1].contains("Name is required"));
        assert!(errors[2].contains("category slug \"poetry\""));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = "categories:\n  - name: Poetry\n    colour: red\n";
        assert!(serde_yaml::from_str::<CatalogFile>(yaml).is_err());
    }
}
