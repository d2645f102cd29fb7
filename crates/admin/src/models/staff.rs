//! Staff accounts.

use chrono::{DateTime, Utc};

use author_store_core::{Email, UserId};

use super::CurrentAdmin;

/// A `store.user` row with `is_staff` set.
#[derive(Debug, Clone)]
pub struct StaffUser {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl StaffUser {
    #[must_use]
    pub fn to_current_admin(&self) -> CurrentAdmin {
        CurrentAdmin {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}
