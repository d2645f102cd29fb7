//! Order management handlers: list, detail, status changes and bulk actions.

mod actions;
mod bulk;
mod detail;
mod list;
pub mod types;

pub use actions::{StatusFormInput, TrackingFormInput, add_tracking, update_status};
pub use bulk::{BulkOrdersInput, bulk_update};
pub use detail::{OrderShowTemplate, show};
pub use list::{OrdersIndexTemplate, index};
pub use types::OrdersQuery;
