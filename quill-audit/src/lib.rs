//! Encrypted, transactional audit trail for quill.
//!
//! Every mutation appends an [`AuditRecord`], a field-by-field snapshot
//! of the resource with each field tagged with a sensitivity
//! [`Classification`], encrypted under the owning scope's audit key and
//! inserted on the caller's open transaction. Mutation and audit row
//! commit or roll back together; no mutation is ever committed without
//! its audit record.
//!
//! Records are append-only: written once, never updated, retained until
//! an external purge policy says otherwise.

mod entry;
mod error;
mod trail;

pub use entry::{AuditOp, AuditRecord, Classification, FieldSnapshot};
pub use error::{AuditError, AuditResult};
pub use trail::{AuditTrail, StoredRecord, AUDIT_SCHEMA};
