//! Abstract encryption interface handed out by the key provider.
//!
//! Consumers (the audit trail) depend on `Arc<dyn KeyWrapper>` and
//! never see raw keys. [`PassthroughWrapper`] is for tests that don't
//! care about ciphertext.

use crate::error::CryptoResult;

/// Trait for encrypting/decrypting opaque byte slices under a key that
/// is already scoped to one owner and purpose.
///
/// Implementations own the key material. Callers never see raw keys.
pub trait KeyWrapper: Send + Sync {
    /// Encrypts `data`, returning a storable string form.
    fn encrypt(&self, data: &[u8]) -> CryptoResult<String>;

    /// Decrypts a string previously produced by [`KeyWrapper::encrypt`].
    fn decrypt(&self, data: &str) -> CryptoResult<Vec<u8>>;
}

/// No-op wrapper for tests. Data passes through base64 unchanged.
pub struct PassthroughWrapper;

impl KeyWrapper for PassthroughWrapper {
    fn encrypt(&self, data: &[u8]) -> CryptoResult<String> {
        use base64::{engine::general_purpose::STANDARD, Engine};
        Ok(STANDARD.encode(data))
    }

    fn decrypt(&self, data: &str) -> CryptoResult<Vec<u8>> {
        use base64::{engine::general_purpose::STANDARD, Engine};
        STANDARD
            .decode(data)
            .map_err(|e| crate::CryptoError::Decryption(format!("invalid base64: {e}")))
    }
}
