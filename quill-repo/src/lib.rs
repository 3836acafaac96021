//! Versioned, audited resource repository for quill.
//!
//! [`Repository`] is the only surface callers see. Every mutation runs
//! inside exactly one storage transaction that also carries the
//! encrypted audit record for the change; updates are guarded by an
//! optimistic version check; deletes leave tombstones so remote callers
//! can resynchronize incrementally via [`Repository::list_deleted_ids`].
//!
//! The shipped resource type is [`Binding`], a named pointer owned by a
//! scope, optionally referencing a target row.
//!
//! # Invariants
//!
//! - A successful update increments `version` by exactly 1; a stale
//!   expected version fails with [`RepoError::Conflict`] and mutates
//!   nothing.
//! - The audit row commits or rolls back with the mutation it describes.
//! - Keyset pagination returns every item exactly once across pages;
//!   rows touched after pagination started appear at the end.

mod binding;
mod config;
mod cursor;
mod error;
mod repository;
mod schema;
mod sync;

pub use binding::{parse_field_mask, Binding, BindingField, BINDING_PREFIX};
pub use config::RepositoryConfig;
pub use cursor::{ListOptions, Page, PageCursor};
pub use error::{RepoError, RepoResult};
pub use repository::Repository;
pub use schema::provision_target;
pub use sync::DeletedIds;
