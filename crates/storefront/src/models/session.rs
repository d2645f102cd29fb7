//! Session-stored state.

use serde::{Deserialize, Serialize};

use author_store_core::{Email, UserId};

/// Identity of the signed-in customer, kept in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub email: Email,
}

/// Session keys.
pub mod keys {
    /// The signed-in [`super::CurrentUser`].
    pub const CURRENT_USER: &str = "current_user";

    /// Random key identifying an anonymous visitor's cart.
    pub const GUEST_CART: &str = "cart_key";
}
