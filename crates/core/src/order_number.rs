//! Customer-facing order numbers.
//!
//! Format: `ORD-YYYYMMDD-XXXXXXXX`, the date of placement followed by eight
//! upper-case hex characters from a random UUID.

use core::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed order number: {0}")]
pub struct OrderNumberError(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    const PREFIX: &'static str = "ORD";
    const SUFFIX_LEN: usize = 8;

    /// A fresh order number for an order placed at `placed_at`.
    #[must_use]
    pub fn generate(placed_at: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        let suffix = suffix.get(..Self::SUFFIX_LEN).unwrap_or(&suffix);
        Self(format!(
            "{}-{}-{}",
            Self::PREFIX,
            placed_at.format("%Y%m%d"),
            suffix.to_ascii_uppercase()
        ))
    }

    /// # Errors
    ///
    /// Returns [`OrderNumberError`] unless `s` matches the order number format.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let malformed = || OrderNumberError(s.to_owned());
        let mut parts = s.split('-');
        let (Some(prefix), Some(date), Some(suffix), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        let suffix_ok = suffix.len() == Self::SUFFIX_LEN
            && suffix
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c));
        if prefix != Self::PREFIX
            || NaiveDate::parse_from_str(date, "%Y%m%d").is_err()
            || !suffix_ok
        {
            return Err(malformed());
        }
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
