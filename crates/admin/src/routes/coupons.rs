//! Coupon management.

use askama::Template;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use author_store_core::{CouponId, CouponRules, DiscountType};

use crate::{
    db::{CouponRepository, RepositoryError},
    error::AppError,
    filters,
    middleware::RequireAdminAuth,
    models::Coupon,
    state::AppState,
};

use super::dashboard::AdminUserView;
use super::render_page;

#[derive(Template)]
#[template(path = "coupons/index.html")]
pub struct CouponsIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub coupons: Vec<Coupon>,
    pub form: CouponFormInput,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponFormInput {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub discount_type: String,
    #[serde(default)]
    pub discount_value: String,
    #[serde(default)]
    pub min_order_amount: String,
    #[serde(default)]
    pub max_uses: String,
    /// `YYYY-MM-DD`; blank starts the coupon now.
    #[serde(default)]
    pub valid_from: String,
    /// `YYYY-MM-DD`, inclusive; blank never expires.
    #[serde(default)]
    pub valid_until: String,
}

fn parse_date(field: &str, value: &str) -> Result<Option<NaiveDate>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<NaiveDate>()
        .map(Some)
        .map_err(|_| format!("{field} must be a date (YYYY-MM-DD)"))
}

impl CouponFormInput {
    /// Parse and validate the form into a code and rules.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn parse(&self, now: DateTime<Utc>) -> Result<(String, CouponRules), String> {
        let code = self.code.trim();
        if code.is_empty() {
            return Err("Code is required".to_string());
        }
        let discount_type: DiscountType = self.discount_type.trim().parse()?;
        let discount_value = self
            .discount_value
            .trim()
            .parse::<Decimal>()
            .map_err(|_| "Discount value must be a number".to_string())?;
        let min_order_amount = if self.min_order_amount.trim().is_empty() {
            Decimal::ZERO
        } else {
            self.min_order_amount
                .trim()
                .parse::<Decimal>()
                .map_err(|_| "Minimum order amount must be a number".to_string())?
        };
        let max_uses = self
            .max_uses
            .trim()
            .parse::<i32>()
            .map_err(|_| "Max uses must be a whole number".to_string())?;

        let valid_from = parse_date("Valid from", &self.valid_from)?
            .map_or(now, |date| date.and_time(NaiveTime::MIN).and_utc());
        let valid_until = parse_date("Valid until", &self.valid_until)?.and_then(|date| {
            date.and_hms_opt(23, 59, 59).map(|end| end.and_utc())
        });

        let rules = CouponRules {
            discount_type,
            discount_value,
            min_order_amount,
            max_uses,
            used_count: 0,
            valid_from,
            valid_until,
            is_active: true,
        };
        rules.validate_definition().map_err(|e| e.to_string())?;

        Ok((code.to_string(), rules))
    }
}

async fn coupons_page(
    state: &AppState,
    admin: AdminUserView,
    form: CouponFormInput,
    error: Option<String>,
) -> Result<Html<String>, AppError> {
    let coupons = CouponRepository::new(state.pool()).list().await?;
    Ok(render_page(&CouponsIndexTemplate {
        admin_user: admin,
        current_path: "/coupons".to_string(),
        coupons,
        form,
        error,
    }))
}

/// GET /coupons
#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let form = CouponFormInput {
        discount_type: DiscountType::Percentage.as_str().to_string(),
        max_uses: "100".to_string(),
        ..CouponFormInput::default()
    };
    coupons_page(&state, AdminUserView::from(&admin), form, None).await
}

/// POST /coupons
#[instrument(skip(admin, state, form), fields(code = %form.code))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Form(form): Form<CouponFormInput>,
) -> Result<Response, AppError> {
    let admin = AdminUserView::from(&admin);
    let (code, rules) = match form.parse(Utc::now()) {
        Ok(parsed) => parsed,
        Err(message) => {
            let page = coupons_page(&state, admin, form, Some(message)).await?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    match CouponRepository::new(state.pool())
        .create(&code, &form.description, &rules)
        .await
    {
        Ok(id) => {
            tracing::info!(coupon_id = %id, "Coupon created");
            Ok(Redirect::to("/coupons").into_response())
        }
        Err(RepositoryError::Conflict(message)) => {
            let page = coupons_page(&state, admin, form, Some(message)).await?;
            Ok((StatusCode::CONFLICT, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /coupons/{id}/toggle
#[instrument(skip(_admin, state))]
pub async fn toggle(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<CouponId>,
) -> Result<Redirect, AppError> {
    let active = CouponRepository::new(state.pool()).toggle_active(id).await?;
    tracing::info!(coupon_id = %id, active, "Coupon toggled");
    Ok(Redirect::to("/coupons"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> CouponFormInput {
        CouponFormInput {
            code: " spring10 ".to_string(),
            discount_type: "percentage".to_string(),
            discount_value: "10".to_string(),
            max_uses: "50".to_string(),
            valid_until: "2026-12-31".to_string(),
            ..CouponFormInput::default()
        }
    }

    fn now() -> DateTime<Utc> {
        "2026-10-15T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn coupon_form_parses_defaults() {
        let (code, rules) = form().parse(now()).unwrap();
        assert_eq!(code, "spring10");
        assert_eq!(rules.min_order_amount, Decimal::ZERO);
        assert_eq!(rules.valid_from, now());
        assert_eq!(
            rules.valid_until,
            Some("2026-12-31T23:59:59Z".parse().unwrap())
        );
        assert_eq!(rules.used_count, 0);
        assert!(rules.is_active);
    }

    #[test]
    fn coupon_form_rejects_invalid_definitions() {
        let mut too_much = form();
        too_much.discount_value = "150".to_string();
        assert_eq!(
            too_much.parse(now()).unwrap_err(),
            "invalid coupon definition: percentage discounts cannot exceed 100"
        );

        let mut backwards = form();
        backwards.valid_from = "2027-01-01".to_string();
        assert!(backwards.parse(now()).is_err());

        let mut bad_type = form();
        bad_type.discount_type = "bogo".to_string();
        assert_eq!(bad_type.parse(now()).unwrap_err(), "invalid discount type: bogo");
    }
}
