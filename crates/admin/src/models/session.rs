//! Session-stored admin identity.

use serde::{Deserialize, Serialize};

use author_store_core::{Email, UserId};

/// Minimal data stored in the session to identify the signed-in staff member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub id: UserId,
    pub username: String,
    pub email: Email,
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current signed-in staff member.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
