//! Core type definitions for quill.
//!
//! Defines the identifier and timestamp types every other quill crate
//! depends on:
//! - [`PublicId`] / [`ScopeId`]: opaque resource and scope identifiers
//! - [`IdGenerator`]: injectable identifier source (uuid v7 by default)
//! - [`Timestamp`]: millisecond wall-clock time with a total order
//!
//! These types form the contract between the storage, audit, and
//! repository layers.

mod ids;
mod timestamp;

pub use ids::{IdError, IdGenerator, PublicId, ScopeId, UuidGenerator};
pub use timestamp::Timestamp;
