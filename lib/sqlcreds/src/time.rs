//! Expiration timestamps as they appear in statement templates.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// `YYYY-MM-DD HH:MM:SS±ZZZZ`
pub const EXPIRATION_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// Credential expiry, kept in the offset the caller supplied it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expiration(pub DateTime<FixedOffset>);

impl Expiration {
    pub fn inner(&self) -> &DateTime<FixedOffset> {
        &self.0
    }
}

impl std::fmt::Display for Expiration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(EXPIRATION_FORMAT))
    }
}

impl From<DateTime<FixedOffset>> for Expiration {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Expiration(dt)
    }
}

impl From<DateTime<Utc>> for Expiration {
    fn from(dt: DateTime<Utc>) -> Self {
        Expiration(dt.fixed_offset())
    }
}
