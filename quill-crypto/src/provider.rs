//! Key provider: hands out per-scope, per-purpose key wrappers.
//!
//! [`StaticKeyProvider`] derives scope keys from a single root key, so
//! rotating the root invalidates every derived wrapper at once. A real
//! deployment can substitute an external KMS behind the same trait.

use crate::cipher::{self, AeadKey, SealedBlob, KEY_SIZE};
use crate::error::{CryptoError, CryptoResult};
use crate::wrapper::KeyWrapper;
use quill_types::ScopeId;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// What a requested key will be used for. Separate purposes get
/// independent derived keys even within one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPurpose {
    /// Encrypting audit-trail records.
    Audit,
}

impl fmt::Display for KeyPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audit => write!(f, "audit"),
        }
    }
}

/// Source of scoped key wrappers.
pub trait KeyProvider: Send + Sync {
    /// Returns a wrapper bound to `scope` and `purpose`, or
    /// [`CryptoError::KeyUnavailable`] if no key can be produced.
    fn get_wrapper(&self, scope: &ScopeId, purpose: KeyPurpose)
        -> CryptoResult<Arc<dyn KeyWrapper>>;
}

/// Provider deriving per-scope keys from one root key.
pub struct StaticKeyProvider {
    root: AeadKey,
}

impl StaticKeyProvider {
    /// Creates a provider around an existing root key.
    #[must_use]
    pub fn new(root: AeadKey) -> Self {
        Self { root }
    }

    /// Creates a provider with a freshly generated root key.
    #[must_use]
    pub fn random() -> Self {
        Self {
            root: AeadKey::random(),
        }
    }

    fn derive(&self, scope: &ScopeId, purpose: KeyPurpose) -> AeadKey {
        let mut hasher = Sha256::new();
        hasher.update(self.root.as_bytes());
        hasher.update([0x1f]);
        hasher.update(purpose.to_string().as_bytes());
        hasher.update([0x1f]);
        hasher.update(scope.as_str().as_bytes());
        let digest: [u8; KEY_SIZE] = hasher.finalize().into();
        AeadKey::from_bytes(digest)
    }
}

impl KeyProvider for StaticKeyProvider {
    fn get_wrapper(
        &self,
        scope: &ScopeId,
        purpose: KeyPurpose,
    ) -> CryptoResult<Arc<dyn KeyWrapper>> {
        Ok(Arc::new(ScopedWrapper {
            key: self.derive(scope, purpose),
            aad: format!("{purpose}\x1f{scope}").into_bytes(),
        }))
    }
}

/// Wrapper produced by [`StaticKeyProvider`]; binds scope and purpose
/// into the AEAD associated data.
struct ScopedWrapper {
    key: AeadKey,
    aad: Vec<u8>,
}

impl KeyWrapper for ScopedWrapper {
    fn encrypt(&self, data: &[u8]) -> CryptoResult<String> {
        Ok(cipher::seal(&self.key, &self.aad, data)?.to_base64())
    }

    fn decrypt(&self, data: &str) -> CryptoResult<Vec<u8>> {
        let blob = SealedBlob::from_base64(data)?;
        cipher::open(&self.key, &self.aad, &blob)
    }
}

/// Provider that refuses every request. Used to exercise the
/// abort-on-missing-key path without a broken KMS.
pub struct DenyAllProvider;

impl KeyProvider for DenyAllProvider {
    fn get_wrapper(
        &self,
        scope: &ScopeId,
        purpose: KeyPurpose,
    ) -> CryptoResult<Arc<dyn KeyWrapper>> {
        Err(CryptoError::KeyUnavailable {
            scope: scope.to_string(),
            purpose: purpose.to_string(),
        })
    }
}
