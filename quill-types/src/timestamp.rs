//! Millisecond wall-clock timestamps.
//!
//! Stored as integer millis since the Unix epoch so values round-trip
//! through SQLite INTEGER columns without precision loss. Resource
//! timestamps are always assigned from the database clock inside the
//! owning transaction, never from the caller's clock.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A point in time with millisecond precision.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from millis since the Unix epoch.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns millis since the Unix epoch.
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// The Unix epoch itself, the lower bound of every sync window.
    #[must_use]
    pub const fn epoch() -> Self {
        Self(0)
    }

    /// Reads the process clock. Prefer the database clock (captured
    /// inside a transaction) for anything persisted or compared.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self(millis)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
