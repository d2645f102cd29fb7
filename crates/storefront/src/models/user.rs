//! Customer accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;

use author_store_core::{Email, UserId};

use super::CurrentUser;

/// A registered customer or staff member.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip)]
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn to_current_user(&self) -> CurrentUser {
        CurrentUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}
