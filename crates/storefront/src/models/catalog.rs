//! Categories and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use author_store_core::{CategoryId, ProductId};

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Available products in this category.
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A catalog product with its approved-review summary.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub category_name: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_available: bool,
    pub low_stock_threshold: i32,
    pub image_url: Option<String>,
    pub average_rating: Option<Decimal>,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Purchasable right now.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0 && self.is_available
    }

    /// Whether `quantity` units could be sold from current stock.
    #[must_use]
    pub const fn can_supply(&self, quantity: i32) -> bool {
        self.is_available && quantity > 0 && quantity <= self.stock
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use author_store_core::{CategoryId, ProductId};

    use super::Product;

    pub fn product(id: i32, price: &str, stock: i32) -> Product {
        Product {
            id: ProductId::new(id),
            category_id: CategoryId::new(1),
            category_name: "Novels".to_string(),
            name: format!("Book {id}"),
            slug: format!("book-{id}"),
            description: String::new(),
            price: price.parse::<Decimal>().unwrap_or_default(),
            stock,
            is_available: true,
            low_stock_threshold: 5,
            image_url: None,
            average_rating: None,
            review_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::product;

    #[test]
    fn in_stock_needs_stock_and_availability() {
        let mut p = product(1, "10.00", 3);
        assert!(p.in_stock());
        p.is_available = false;
        assert!(!p.in_stock());
        p.is_available = true;
        p.stock = 0;
        assert!(!p.in_stock());
    }

    #[test]
    fn can_supply_respects_stock() {
        let p = product(1, "10.00", 3);
        assert!(p.can_supply(3));
        assert!(!p.can_supply(4));
        assert!(!p.can_supply(0));
    }
}
