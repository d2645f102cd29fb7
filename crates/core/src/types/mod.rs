//! Type-safe wrappers for store domain concepts.

pub mod email;
pub mod id;
pub mod rating;
pub mod status;
pub mod username;

pub use email::{Email, EmailError};
pub use id::*;
pub use rating::{Rating, RatingError};
pub use status::*;
pub use username::{Username, UsernameError};
