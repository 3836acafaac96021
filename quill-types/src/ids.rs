//! Identifier types used throughout the quill core.
//!
//! Public ids are opaque prefixed strings (`bnd_018f3c…`). The repository
//! never inspects the suffix; it only relies on ids being unique, stable,
//! and totally ordered (the pagination tie-break sorts on them).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Errors from identifier construction and parsing.
#[derive(Debug, Error)]
pub enum IdError {
    /// The id string is empty or missing its prefix segment.
    #[error("malformed id: {0:?}")]
    Malformed(String),
    /// The type prefix is empty or contains a separator.
    #[error("invalid id prefix: {0:?}")]
    InvalidPrefix(String),
}

/// Opaque public identifier for a stored resource.
///
/// Assigned exactly once at creation and never reused. The string form is
/// `<prefix>_<suffix>`; ordering is plain lexicographic over the whole
/// string, which is what the keyset pagination tie-break relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicId(String);

impl PublicId {
    /// Wraps an id string, validating the `prefix_suffix` shape.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        match s.split_once('_') {
            Some((p, rest)) if !p.is_empty() && !rest.is_empty() => Ok(Self(s.to_string())),
            _ => Err(IdError::Malformed(s.to_string())),
        }
    }

    /// Returns the string form of the id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the type prefix segment.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.split_once('_').map(|(p, _)| p).unwrap_or("")
    }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PublicId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identifier of the scope that owns a resource.
///
/// Scopes are provisioned outside this crate; the value is treated as an
/// opaque non-empty string (e.g. `p_123`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(String);

impl ScopeId {
    /// Wraps a scope id string. Rejects the empty string.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Err(IdError::Malformed(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the string form of the scope id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ScopeId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Injectable source of new public ids.
///
/// The repository never generates ids inline; it calls through this trait
/// so deployments can plug in their own scheme (and tests can make ids
/// deterministic).
pub trait IdGenerator: Send + Sync {
    /// Produces a fresh id under the given type prefix.
    fn new_id(&self, prefix: &str) -> Result<PublicId, IdError>;
}

/// Default generator backed by UUID v7.
///
/// The embedded timestamp makes suffixes roughly time-ordered, which
/// keeps freshly created rows clustered at the end of id-ordered scans.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn new_id(&self, prefix: &str) -> Result<PublicId, IdError> {
        if prefix.is_empty() || prefix.contains('_') {
            return Err(IdError::InvalidPrefix(prefix.to_string()));
        }
        Ok(PublicId(format!("{prefix}_{}", Uuid::now_v7().simple())))
    }
}
