//! Catalog records as staff edit them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use author_store_core::{CategoryId, ProductId};

#[derive(Debug, Clone)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// All products in the category, available or not.
    pub product_count: i64,
}

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
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// In stock, but at or below its reorder threshold.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.is_available && self.stock > 0 && self.stock <= self.low_stock_threshold
    }

    #[must_use]
    pub const fn is_out_of_stock(&self) -> bool {
        self.stock == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i32, threshold: i32, is_available: bool) -> Product {
        Product {
            id: ProductId::new(1),
            category_id: CategoryId::new(1),
            category_name: "Fiction".to_string(),
            name: "The Long Road".to_string(),
            slug: "the-long-road".to_string(),
            description: String::new(),
            price: Decimal::new(1999, 2),
            stock,
            is_available,
            low_stock_threshold: threshold,
            image_url: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn low_stock_boundaries() {
        assert!(product(5, 5, true).is_low_stock());
        assert!(product(1, 5, true).is_low_stock());
        assert!(!product(6, 5, true).is_low_stock());
        assert!(!product(0, 5, true).is_low_stock());
        assert!(!product(3, 5, false).is_low_stock());
    }

    #[test]
    fn out_of_stock_ignores_availability() {
        assert!(product(0, 5, true).is_out_of_stock());
        assert!(product(0, 5, false).is_out_of_stock());
        assert!(!product(2, 5, true).is_out_of_stock());
    }
}
