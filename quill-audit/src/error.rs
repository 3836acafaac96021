//! Error types for the audit layer.

use thiserror::Error;

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// Errors that can occur while building or persisting audit records.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Encryption or decryption of the record payload failed.
    #[error("audit crypto error: {0}")]
    Crypto(#[from] quill_crypto::CryptoError),

    /// The audit row could not be written or read.
    #[error("audit storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The record payload could not be (de)serialized.
    #[error("audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
