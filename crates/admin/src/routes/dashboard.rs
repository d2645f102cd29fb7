//! Dashboard handlers.

use askama::Template;
use axum::{Json, extract::State, response::Html};
use chrono::Utc;
use tracing::instrument;

use crate::{
    error::AppError,
    filters,
    middleware::RequireAdminAuth,
    models::CurrentAdmin,
    services::{AnalyticsService, DashboardData},
    state::AppState,
};

use super::render_page;

/// Signed-in staff member as shown in the page header.
#[derive(Debug, Clone)]
pub struct AdminUserView {
    pub username: String,
    pub email: String,
}

impl From<&CurrentAdmin> for AdminUserView {
    fn from(admin: &CurrentAdmin) -> Self {
        Self {
            username: admin.username.clone(),
            email: admin.email.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub data: DashboardData,
    /// Largest daily revenue, for scaling the sales bars.
    pub peak_revenue: rust_decimal::Decimal,
}

impl DashboardTemplate {
    /// Bar width for a day's revenue, 0-100.
    fn bar_width(&self, revenue: &rust_decimal::Decimal) -> u32 {
        use rust_decimal::prelude::ToPrimitive;

        if self.peak_revenue.is_zero() {
            return 0;
        }
        (*revenue * rust_decimal::Decimal::ONE_HUNDRED / self.peak_revenue)
            .round()
            .to_u32()
            .unwrap_or(0)
    }
}

/// Dashboard page handler.
#[instrument(skip(admin, state))]
pub async fn dashboard(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let data = AnalyticsService::new(state.pool())
        .dashboard(Utc::now())
        .await?;
    let peak_revenue = data
        .daily_sales
        .iter()
        .map(|day| day.revenue)
        .max()
        .unwrap_or_default();

    Ok(render_page(&DashboardTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/".to_string(),
        data,
        peak_revenue,
    }))
}

/// GET /api/analytics/dashboard
#[instrument(skip(_admin, state))]
pub async fn dashboard_json(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<DashboardData>, AppError> {
    let data = AnalyticsService::new(state.pool())
        .dashboard(Utc::now())
        .await?;
    Ok(Json(data))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::{CustomerStats, DailySales, ReviewStats, SalesWindows};
    use crate::services::analytics::{
        InventoryAlerts, SalesOverview, order_breakdown, payment_breakdown,
    };

    fn template(daily_sales: Vec<DailySales>) -> DashboardTemplate {
        let peak_revenue = daily_sales
            .iter()
            .map(|day| day.revenue)
            .max()
            .unwrap_or_default();
        DashboardTemplate {
            admin_user: AdminUserView {
                username: "staff".to_string(),
                email: "staff@example.com".to_string(),
            },
            current_path: "/".to_string(),
            data: DashboardData {
                generated_at: Utc::now(),
                sales: SalesOverview {
                    windows: SalesWindows::default(),
                    average_order_value: Decimal::ZERO,
                },
                top_products: Vec::new(),
                recent_orders: Vec::new(),
                order_statuses: order_breakdown(&[]),
                payment_statuses: payment_breakdown(&[]),
                customers: CustomerStats::default(),
                inventory: InventoryAlerts {
                    low_stock_count: 0,
                    out_of_stock_count: 0,
                    low_stock: Vec::new(),
                    out_of_stock: Vec::new(),
                },
                reviews: ReviewStats::default(),
                daily_sales,
            },
            peak_revenue,
        }
    }

    fn day(d: u32, revenue: i64) -> DailySales {
        DailySales {
            date: NaiveDate::from_ymd_opt(2026, 10, d).unwrap(),
            orders: 1,
            revenue: Decimal::new(revenue, 0),
        }
    }

    #[test]
    fn bar_width_scales_to_peak() {
        let page = template(vec![day(14, 50), day(15, 200)]);
        assert_eq!(page.bar_width(&Decimal::new(50, 0)), 25);
        assert_eq!(page.bar_width(&Decimal::new(200, 0)), 100);
        assert_eq!(template(Vec::new()).bar_width(&Decimal::ZERO), 0);
    }

    #[test]
    fn dashboard_renders_sales_bars() {
        let html = template(vec![day(14, 50), day(15, 200)]).render().unwrap();
        assert!(html.contains("width: 25%;"));
        assert!(html.contains("width: 100%;"));
    }
}
