//! Maps low-level SQLite failures into domain error kinds.
//!
//! The primary path reads SQLite's structured extended result codes
//! (`SQLITE_CONSTRAINT_UNIQUE`, `SQLITE_CONSTRAINT_FOREIGNKEY`, …); the
//! error message is consulted only to name the violated column set.
//! Message-substring matching is kept as a last-resort fallback for
//! errors that arrive without an extended code.

use crate::error::DbError;
use rusqlite::ffi::{
    ErrorCode, SQLITE_CONSTRAINT_FOREIGNKEY, SQLITE_CONSTRAINT_PRIMARYKEY,
    SQLITE_CONSTRAINT_TRIGGER, SQLITE_CONSTRAINT_UNIQUE,
};

/// Classifies a raw SQLite error into a [`DbError`].
pub fn classify(err: rusqlite::Error) -> DbError {
    let (code, message) = match err {
        rusqlite::Error::SqliteFailure(code, message) => (code, message),
        other => return DbError::Sqlite(other),
    };

    match code.code {
        ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
            return DbError::Busy(message.unwrap_or_else(|| code.to_string()));
        }
        ErrorCode::ConstraintViolation => {}
        _ => return DbError::Sqlite(rusqlite::Error::SqliteFailure(code, message)),
    }

    let msg = message.clone().unwrap_or_default();
    match code.extended_code {
        SQLITE_CONSTRAINT_UNIQUE | SQLITE_CONSTRAINT_PRIMARYKEY => DbError::NotUnique {
            domain: unique_domain(&msg),
        },
        SQLITE_CONSTRAINT_FOREIGNKEY | SQLITE_CONSTRAINT_TRIGGER => DbError::ForeignKeyMissing(msg),
        // Fallback: some wrappers strip the extended code. Substring
        // matching is brittle; keep it only for this case.
        _ if msg.contains("UNIQUE constraint failed") => DbError::NotUnique {
            domain: unique_domain(&msg),
        },
        _ if msg.contains("FOREIGN KEY constraint failed") => DbError::ForeignKeyMissing(msg),
        _ => DbError::Sqlite(rusqlite::Error::SqliteFailure(code, message)),
    }
}

/// Extracts the violated column set from a SQLite unique-constraint
/// message, e.g. `UNIQUE constraint failed: binding.scope_id, binding.name`
/// yields `binding.scope_id, binding.name`.
fn unique_domain(msg: &str) -> String {
    msg.rsplit_once("constraint failed: ")
        .map(|(_, cols)| cols.trim().to_string())
        .unwrap_or_else(|| msg.to_string())
}
