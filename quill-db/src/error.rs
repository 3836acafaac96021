//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in storage operations, classified as close to
/// the SQLite boundary as possible (see [`crate::classify`]).
#[derive(Debug, Error)]
pub enum DbError {
    /// A uniqueness constraint was violated. `domain` names the violated
    /// column set (e.g. `binding.value`).
    #[error("uniqueness violation on {domain}")]
    NotUnique { domain: String },

    /// A foreign-key constraint was violated: a referenced row is
    /// missing. SQLite does not report which one; callers add context.
    #[error("missing referenced row: {0}")]
    ForeignKeyMissing(String),

    /// Transient contention (busy/locked). Safe to retry.
    #[error("database contention: {0}")]
    Busy(String),

    /// Any other database error, surfaced opaquely.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Distinguishes transient infrastructure failures (retried by the
/// transaction driver) from domain errors (surfaced immediately).
///
/// Optimistic version conflicts and integrity violations must never be
/// retried; a blanket backoff-retry would discard the caller's
/// conflict-detection intent.
pub trait Transient {
    /// Whether retrying the whole transaction may succeed.
    fn is_transient(&self) -> bool;
}

impl Transient for DbError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Busy(_))
    }
}
