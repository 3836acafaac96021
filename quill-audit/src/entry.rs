//! Audit record construction with field-level sensitivity tags.

use crate::error::AuditResult;
use quill_types::{PublicId, ScopeId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The mutation an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOp {
    Create,
    Update,
    Delete,
}

impl fmt::Display for AuditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Sensitivity classification of one snapshot field.
///
/// Classifications come from a static per-resource-type table, never from
/// the data itself. `Secret` fields are redacted before the record is
/// even encrypted, so a decrypted audit payload still never contains
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Safe to show anyone who may read the decrypted record.
    Public,
    /// Present in the payload but protected by the record encryption.
    Sensitive,
    /// Never persisted, even encrypted; replaced by a redaction marker.
    Secret,
}

/// One field of a resource snapshot, tagged with its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub name: String,
    pub classification: Classification,
    pub value: Value,
}

/// A structured audit record: operation kind plus a classified snapshot
/// of the resource at mutation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub op: AuditOp,
    pub resource_type: String,
    pub public_id: PublicId,
    pub scope_id: ScopeId,
    pub fields: Vec<FieldSnapshot>,
}

const REDACTED: &str = "[REDACTED]";

impl AuditRecord {
    /// Starts a record for `op` against the identified resource.
    #[must_use]
    pub fn new(op: AuditOp, resource_type: &str, public_id: PublicId, scope_id: ScopeId) -> Self {
        Self {
            op,
            resource_type: resource_type.to_string(),
            public_id,
            scope_id,
            fields: Vec::new(),
        }
    }

    /// Adds one classified field to the snapshot.
    #[must_use]
    pub fn field(mut self, name: &str, classification: Classification, value: Value) -> Self {
        self.fields.push(FieldSnapshot {
            name: name.to_string(),
            classification,
            value,
        });
        self
    }

    /// Adds a map-valued field, tagging each key individually with the
    /// same classification (`name/key` per entry).
    #[must_use]
    pub fn map_field(
        mut self,
        name: &str,
        classification: Classification,
        entries: &serde_json::Map<String, Value>,
    ) -> Self {
        for (key, value) in entries {
            self.fields.push(FieldSnapshot {
                name: format!("{name}/{key}"),
                classification,
                value: value.clone(),
            });
        }
        self
    }

    /// Serializes the record for storage, replacing `Secret` values with
    /// a redaction marker first.
    pub fn payload(&self) -> AuditResult<Vec<u8>> {
        let mut redacted = self.clone();
        for f in &mut redacted.fields {
            if f.classification == Classification::Secret {
                f.value = Value::String(REDACTED.to_string());
            }
        }
        Ok(serde_json::to_vec(&redacted)?)
    }

    /// Deserializes a record from a stored payload.
    pub fn from_payload(bytes: &[u8]) -> AuditResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
