//! Key-provider boundary and audit-record encryption for quill.
//!
//! The audit layer never sees raw key material. It asks a [`KeyProvider`]
//! for a [`KeyWrapper`] scoped to the owning scope and a purpose, and
//! routes opaque bytes through it. [`StaticKeyProvider`] is the built-in
//! implementation (per-scope keys derived from one root key);
//! [`PassthroughWrapper`] keeps tests free of key setup.

mod cipher;
mod error;
mod provider;
mod wrapper;

pub use cipher::{open, seal, AeadKey, SealedBlob, KEY_SIZE, NONCE_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use provider::{DenyAllProvider, KeyProvider, KeyPurpose, StaticKeyProvider};
pub use wrapper::{KeyWrapper, PassthroughWrapper};
