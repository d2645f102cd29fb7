//! Inventory alerts page.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::{
    db::AnalyticsRepository,
    error::AppError,
    filters,
    middleware::RequireAdminAuth,
    models::StockAlert,
    state::AppState,
};

use super::dashboard::AdminUserView;

#[derive(Template, WebTemplate)]
#[template(path = "inventory/index.html")]
pub struct InventoryTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub low_stock: Vec<StockAlert>,
    pub out_of_stock: Vec<StockAlert>,
}

/// GET /inventory
#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<InventoryTemplate, AppError> {
    let analytics = AnalyticsRepository::new(state.pool());
    let (low_stock, out_of_stock) =
        tokio::try_join!(analytics.low_stock(), analytics.out_of_stock())?;

    Ok(InventoryTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/inventory".to_string(),
        low_stock,
        out_of_stock,
    })
}
