//! Repository configuration.
//!
//! An explicit struct enumerating the recognized knobs, replacing the
//! variadic-options convention some storage layers use.

use quill_db::RetryPolicy;

/// Tunables for a [`crate::Repository`].
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Page size used by list operations when the caller does not
    /// override it. Listing is never unbounded.
    pub default_page_limit: usize,
    /// Retry budget and backoff for transient transaction failures.
    pub retry: RetryPolicy,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_page_limit: 50,
            retry: RetryPolicy::default(),
        }
    }
}
