//! Query parameters and view helpers shared by the order pages.

use serde::Deserialize;

use author_store_core::{OrderStatus, PaymentStatus};

use crate::db::orders::OrderFilter;
use crate::error::AppError;

/// Query parameters for the order list.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub q: Option<String>,
    pub page: Option<i64>,
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl OrdersQuery {
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an unknown status value.
    pub fn to_filter(&self) -> Result<OrderFilter, AppError> {
        let status = blank_to_none(self.status.as_deref())
            .map(str::parse::<OrderStatus>)
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let payment_status = blank_to_none(self.payment_status.as_deref())
            .map(str::parse::<PaymentStatus>)
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        Ok(OrderFilter {
            status,
            payment_status,
            search: blank_to_none(self.q.as_deref()).map(str::to_owned),
            page: self.page.unwrap_or(1).max(1),
        })
    }

    /// Query string for another page of the same list.
    #[must_use]
    pub fn page_link(&self, page: i64) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in [
            ("status", self.status.as_deref()),
            ("payment_status", self.payment_status.as_deref()),
            ("q", self.q.as_deref()),
        ] {
            if let Some(value) = blank_to_none(value) {
                query.append_pair(key, value);
            }
        }
        query.append_pair("page", &page.to_string());
        format!("/orders?{}", query.finish())
    }
}

/// CSS class for a status badge.
#[must_use]
pub const fn status_class(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "badge-pending",
        OrderStatus::Processing | OrderStatus::Shipped => "badge-info",
        OrderStatus::Delivered => "badge-ok",
        OrderStatus::Cancelled => "badge-muted",
    }
}

#[must_use]
pub const fn payment_class(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "badge-pending",
        PaymentStatus::Completed => "badge-ok",
        PaymentStatus::Failed => "badge-error",
        PaymentStatus::Refunded => "badge-muted",
    }
}
