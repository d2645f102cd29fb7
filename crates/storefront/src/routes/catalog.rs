//! Categories, products and product reviews.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use crate::db::{CatalogRepository, ProductFilter, ProductOrdering, ReviewRepository};
use crate::error::{AppError, Result};
use crate::models::{Category, Review};
use crate::state::AppState;
use crate::views::ProductView;

/// Query string for `GET /api/products`.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    /// Category slug.
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub ordering: ProductOrdering,
}

impl From<ProductQuery> for ProductFilter {
    fn from(query: ProductQuery) -> Self {
        Self {
            category_slug: query.category.filter(|s| !s.trim().is_empty()),
            search: query.search,
            min_price: query.min_price,
            max_price: query.max_price,
            in_stock_only: query.in_stock,
            ordering: query.ordering,
        }
    }
}

/// `GET /api/categories`
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = state.categories().await?;
    Ok(Json(categories.as_ref().clone()))
}

/// `GET /api/categories/{slug}`
pub async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Category>> {
    CatalogRepository::new(state.pool())
        .get_category_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
}

/// `GET /api/products`
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<ProductView>>> {
    let products = CatalogRepository::new(state.pool())
        .list_products(&ProductFilter::from(query))
        .await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

/// `GET /api/products/{slug}`
pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductView>> {
    CatalogRepository::new(state.pool())
        .get_product_by_slug(&slug)
        .await?
        .map(|p| Json(ProductView::from(p)))
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

/// `GET /api/products/{slug}/reviews`
pub async fn product_reviews(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Review>>> {
    let product = CatalogRepository::new(state.pool())
        .get_product_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let reviews = ReviewRepository::new(state.pool())
        .list_approved(product.id)
        .await?;
    Ok(Json(reviews))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: &str) -> ProductQuery {
        axum::extract::Query::<ProductQuery>::try_from_uri(
            &format!("http://localhost/api/products?{query}").parse().unwrap(),
        )
        .unwrap()
        .0
    }

    #[test]
    fn query_maps_to_filter() {
        let filter = ProductFilter::from(parse(
            "category=fiction&min_price=5.50&in_stock=true&ordering=-price",
        ));
        assert_eq!(filter.category_slug.as_deref(), Some("fiction"));
        assert_eq!(filter.min_price, Some(Decimal::new(550, 2)));
        assert!(filter.in_stock_only);
        assert_eq!(filter.ordering, ProductOrdering::PriceDesc);
    }

    #[test]
    fn defaults_to_newest_without_filters() {
        let filter = ProductFilter::from(parse("category="));
        assert!(filter.category_slug.is_none());
        assert!(!filter.in_stock_only);
        assert_eq!(filter.ordering, ProductOrdering::Newest);
    }
}
