//! Repository error taxonomy.
//!
//! Domain errors are classified as close to the storage boundary as
//! possible (`quill_db::classify`) and lifted into [`RepoError`] here;
//! transient contention is retried by the transaction driver and only
//! surfaces as [`RepoError::Internal`] once the retry budget runs out.

use quill_audit::AuditError;
use quill_crypto::CryptoError;
use quill_db::{classify, DbError, Transient};
use quill_types::IdError;
use thiserror::Error;

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors returned by repository operations.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The caller supplied malformed or missing required input.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The field mask was empty.
    #[error("empty field mask")]
    EmptyFieldMask,

    /// The field mask named an unrecognized attribute.
    #[error("invalid field mask entry: {0:?}")]
    InvalidFieldMask(String),

    /// A uniqueness constraint was violated. The message names the
    /// violated domain (value vs. name).
    #[error("{message}")]
    AlreadyExists { domain: String, message: String },

    /// A referenced resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller's expected version did not match the stored row.
    /// Never retried here: the caller must re-read the current version
    /// and decide whether to resubmit.
    #[error("version conflict: expected version does not match the stored row")]
    Conflict,

    /// More than one row would have been affected by a single-row
    /// operation. Fatal: it indicates a broken uniqueness invariant.
    #[error("integrity violation: more than 1 record would have been {0}")]
    MultipleRecords(&'static str),

    /// The audit key wrapper could not be obtained or used. The whole
    /// transaction aborts; no mutation commits without its audit record.
    #[error("audit encryption failure: {0}")]
    Encrypt(#[source] CryptoError),

    /// An identifier could not be generated or parsed.
    #[error("invalid id: {0}")]
    Id(#[from] IdError),

    /// Opaque storage failure, surfaced after the retry budget.
    #[error("storage error: {0}")]
    Internal(#[source] DbError),
}

impl From<DbError> for RepoError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotUnique { domain } => Self::AlreadyExists {
                message: format!("uniqueness violation on {domain}"),
                domain,
            },
            DbError::ForeignKeyMissing(msg) => Self::NotFound(format!("missing referenced row: {msg}")),
            other => Self::Internal(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(e: rusqlite::Error) -> Self {
        classify(e).into()
    }
}

impl From<CryptoError> for RepoError {
    fn from(e: CryptoError) -> Self {
        Self::Encrypt(e)
    }
}

impl From<AuditError> for RepoError {
    fn from(e: AuditError) -> Self {
        match e {
            AuditError::Crypto(c) => Self::Encrypt(c),
            AuditError::Storage(s) => classify(s).into(),
            AuditError::Serialization(s) => Self::Encrypt(CryptoError::Serialization(s)),
        }
    }
}

impl Transient for RepoError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Internal(d) if d.is_transient())
    }
}
