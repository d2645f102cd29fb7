//! Product and category management.

use askama::Template;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use author_store_core::{CategoryId, ProductId};

use crate::{
    db::{
        CatalogRepository, RepositoryError,
        catalog::{ProductInput, QuickUpdate},
    },
    error::AppError,
    filters,
    middleware::RequireAdminAuth,
    models::{Category, Product},
    state::AppState,
};

use super::dashboard::AdminUserView;
use super::render_page;

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub q: Option<String>,
}

#[derive(Template)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub products: Vec<Product>,
    pub search_value: String,
}

/// Values shown in the product form, kept as typed so errors can re-render.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFormInput {
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub stock: String,
    /// Checkbox: present when ticked.
    pub is_available: Option<String>,
    #[serde(default)]
    pub low_stock_threshold: String,
    #[serde(default)]
    pub image_url: String,
}

impl ProductFormInput {
    fn from_product(product: &Product) -> Self {
        Self {
            category_id: product.category_id.to_string(),
            name: product.name.clone(),
            slug: product.slug.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            stock: product.stock.to_string(),
            is_available: product.is_available.then(|| "on".to_string()),
            low_stock_threshold: product.low_stock_threshold.to_string(),
            image_url: product.image_url.clone().unwrap_or_default(),
        }
    }

    fn blank() -> Self {
        Self {
            stock: "0".to_string(),
            is_available: Some("on".to_string()),
            low_stock_threshold: "5".to_string(),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn parse(&self) -> Result<ProductInput, String> {
        let category_id = self
            .category_id
            .trim()
            .parse::<i32>()
            .map(CategoryId::new)
            .map_err(|_| "Choose a category".to_string())?;
        let price = self
            .price
            .trim()
            .parse::<Decimal>()
            .map_err(|_| "Price must be a number".to_string())?;
        let stock = parse_int("Stock", &self.stock)?;
        let low_stock_threshold = parse_int("Low stock threshold", &self.low_stock_threshold)?;

        ProductInput {
            category_id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            description: self.description.trim().to_string(),
            price,
            stock,
            is_available: self.is_available.is_some(),
            low_stock_threshold,
            image_url: Some(self.image_url.clone()),
        }
        .normalize()
    }
}

fn parse_int(field: &str, value: &str) -> Result<i32, String> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("{field} must be a whole number"))
}

#[derive(Template)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    /// `None` when creating.
    pub product_id: Option<ProductId>,
    pub form: ProductFormInput,
    pub categories: Vec<Category>,
    pub error: Option<String>,
}

impl ProductFormTemplate {
    fn action(&self) -> String {
        self.product_id
            .map_or_else(|| "/products".to_string(), |id| format!("/products/{id}"))
    }
}

async fn product_form(
    state: &AppState,
    admin: AdminUserView,
    product_id: Option<ProductId>,
    form: ProductFormInput,
    error: Option<String>,
) -> Result<Html<String>, AppError> {
    let categories = CatalogRepository::new(state.pool()).list_categories().await?;
    Ok(render_page(&ProductFormTemplate {
        admin_user: admin,
        current_path: "/products".to_string(),
        product_id,
        form,
        categories,
        error,
    }))
}

/// GET /products
#[instrument(skip(admin, state))]
pub async fn products_index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<Html<String>, AppError> {
    let products = CatalogRepository::new(state.pool())
        .list_products(query.q.as_deref())
        .await?;

    Ok(render_page(&ProductsIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/products".to_string(),
        products,
        search_value: query.q.unwrap_or_default(),
    }))
}

/// GET /products/new
#[instrument(skip(admin, state))]
pub async fn new_product(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    product_form(&state, AdminUserView::from(&admin), None, ProductFormInput::blank(), None).await
}

/// GET /products/{id}/edit
#[instrument(skip(admin, state))]
pub async fn edit_product(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Html<String>, AppError> {
    let product = CatalogRepository::new(state.pool())
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    product_form(
        &state,
        AdminUserView::from(&admin),
        Some(id),
        ProductFormInput::from_product(&product),
        None,
    )
    .await
}

/// Re-render the form with the error for validation failures and slug
/// conflicts; anything else is an application error.
async fn save_product(
    state: &AppState,
    admin: AdminUserView,
    product_id: Option<ProductId>,
    form: ProductFormInput,
) -> Result<Response, AppError> {
    let input = match form.parse() {
        Ok(input) => input,
        Err(message) => {
            let page = product_form(state, admin, product_id, form, Some(message)).await?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let catalog = CatalogRepository::new(state.pool());
    let result = match product_id {
        Some(id) => catalog.update_product(id, &input).await.map(|()| id),
        None => catalog.create_product(&input).await,
    };

    match result {
        Ok(id) => {
            tracing::info!(product_id = %id, slug = %input.slug, "Product saved");
            Ok(Redirect::to("/products").into_response())
        }
        Err(RepositoryError::Conflict(message)) => {
            let page = product_form(state, admin, product_id, form, Some(message)).await?;
            Ok((StatusCode::CONFLICT, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /products
#[instrument(skip(admin, state, form))]
pub async fn create_product(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Form(form): Form<ProductFormInput>,
) -> Result<Response, AppError> {
    save_product(&state, AdminUserView::from(&admin), None, form).await
}

/// POST /products/{id}
#[instrument(skip(admin, state, form))]
pub async fn update_product(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductFormInput>,
) -> Result<Response, AppError> {
    save_product(&state, AdminUserView::from(&admin), Some(id), form).await
}

#[derive(Debug, Deserialize)]
pub struct QuickUpdateInput {
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub stock: String,
    pub is_available: Option<String>,
}

impl QuickUpdateInput {
    fn parse(&self) -> Result<QuickUpdate, String> {
        let price = self
            .price
            .trim()
            .parse::<Decimal>()
            .map_err(|_| "Price must be a number".to_string())?;
        let stock = parse_int("Stock", &self.stock)?;
        if price < Decimal::ZERO || stock < 0 {
            return Err("Price and stock cannot be negative".to_string());
        }
        Ok(QuickUpdate {
            price,
            stock,
            is_available: self.is_available.is_some(),
        })
    }
}

/// POST /products/{id}/quick
#[instrument(skip(_admin, state, input))]
pub async fn quick_update(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Form(input): Form<QuickUpdateInput>,
) -> Result<Redirect, AppError> {
    let update = input.parse().map_err(AppError::BadRequest)?;
    CatalogRepository::new(state.pool())
        .quick_update(id, update)
        .await?;
    Ok(Redirect::to("/products"))
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Template)]
#[template(path = "categories/index.html")]
pub struct CategoriesIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub categories: Vec<Category>,
    pub form: CategoryFormInput,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryFormInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

async fn categories_page(
    state: &AppState,
    admin: AdminUserView,
    form: CategoryFormInput,
    error: Option<String>,
) -> Result<Html<String>, AppError> {
    let categories = CatalogRepository::new(state.pool()).list_categories().await?;
    Ok(render_page(&CategoriesIndexTemplate {
        admin_user: admin,
        current_path: "/categories".to_string(),
        categories,
        form,
        error,
    }))
}

/// GET /categories
#[instrument(skip(admin, state))]
pub async fn categories_index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    categories_page(&state, AdminUserView::from(&admin), CategoryFormInput::default(), None).await
}

/// POST /categories
#[instrument(skip(admin, state, form))]
pub async fn create_category(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Form(form): Form<CategoryFormInput>,
) -> Result<Response, AppError> {
    let admin = AdminUserView::from(&admin);
    if form.name.trim().is_empty() {
        let page = categories_page(&state, admin, form, Some("Name is required".to_string())).await?;
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    match CatalogRepository::new(state.pool())
        .create_category(&form.name, &form.slug, &form.description)
        .await
    {
        Ok(id) => {
            tracing::info!(category_id = %id, "Category created");
            Ok(Redirect::to("/categories").into_response())
        }
        Err(RepositoryError::Conflict(message)) => {
            let page = categories_page(&state, admin, form, Some(message)).await?;
            Ok((StatusCode::CONFLICT, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ProductFormInput {
        ProductFormInput {
            category_id: "2".to_string(),
            name: "Tides".to_string(),
            price: "14.50".to_string(),
            stock: "3".to_string(),
            low_stock_threshold: "5".to_string(),
            ..ProductFormInput::default()
        }
    }

    #[test]
    fn product_form_parses_checkbox_and_numbers() {
        let input = form().parse().unwrap();
        assert_eq!(input.category_id, CategoryId::new(2));
        assert_eq!(input.price, Decimal::new(1450, 2));
        assert!(!input.is_available);
        assert_eq!(input.slug, "tides");
    }

    #[test]
    fn product_form_reports_bad_numbers() {
        let mut bad = form();
        bad.stock = "three".to_string();
        assert_eq!(bad.parse().unwrap_err(), "Stock must be a whole number");

        let mut no_category = form();
        no_category.category_id = String::new();
        assert_eq!(no_category.parse().unwrap_err(), "Choose a category");
    }

    #[test]
    fn quick_update_rejects_negative_values() {
        let input = QuickUpdateInput {
            price: "-1".to_string(),
            stock: "2".to_string(),
            is_available: Some("on".to_string()),
        };
        assert!(input.parse().is_err());

        let ok = QuickUpdateInput {
            price: "9.99".to_string(),
            stock: "0".to_string(),
            is_available: None,
        };
        let update = ok.parse().unwrap();
        assert_eq!(update.stock, 0);
        assert!(!update.is_available);
    }
}
