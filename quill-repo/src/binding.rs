//! The binding resource and its field-mask vocabulary.

use crate::error::{RepoError, RepoResult};
use quill_audit::{AuditOp, AuditRecord, Classification};
use quill_types::{PublicId, ScopeId, Timestamp};
use rusqlite::Row;
use serde_json::Value;

/// Public-id prefix for bindings.
pub const BINDING_PREFIX: &str = "bnd";

/// A named pointer owned by a scope, optionally referencing a target.
///
/// `value` is globally unique; `name` is unique within the owning scope.
/// `public_id`, `version`, and both timestamps are server-assigned:
/// callers leave `public_id` empty on create and pass the last version
/// they observed on update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Assigned once at creation; must be `None` when creating.
    pub public_id: Option<PublicId>,
    pub scope_id: ScopeId,
    pub value: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub target_id: Option<PublicId>,
    /// Starts at 1; incremented by exactly 1 per successful update.
    pub version: u32,
    pub create_time: Timestamp,
    pub update_time: Timestamp,
}

impl Binding {
    /// Shorthand for the fields a caller supplies when creating.
    #[must_use]
    pub fn new(scope_id: ScopeId, value: &str) -> Self {
        Self {
            public_id: None,
            scope_id,
            value: value.to_string(),
            name: None,
            description: None,
            target_id: None,
            version: 0,
            create_time: Timestamp::epoch(),
            update_time: Timestamp::epoch(),
        }
    }

    /// Column list matching [`Binding::from_row`].
    pub(crate) const COLUMNS: &'static str =
        "public_id, scope_id, value, name, description, target_id, version, create_time, update_time";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let public_id: String = row.get(0)?;
        let scope_id: String = row.get(1)?;
        let target_id: Option<String> = row.get(5)?;
        Ok(Self {
            public_id: Some(parse_col(0, PublicId::parse(&public_id))?),
            scope_id: parse_col(1, ScopeId::parse(&scope_id))?,
            value: row.get(2)?,
            name: row.get(3)?,
            description: row.get(4)?,
            target_id: match target_id {
                Some(t) => Some(parse_col(5, PublicId::parse(&t))?),
                None => None,
            },
            version: row.get(6)?,
            create_time: Timestamp::from_millis(row.get(7)?),
            update_time: Timestamp::from_millis(row.get(8)?),
        })
    }

    /// Builds the audit snapshot for this binding. Classifications come
    /// from the static table below, not from the data: `value` is
    /// routable and therefore sensitive, the rest is public metadata.
    pub(crate) fn audit_record(&self, op: AuditOp, id: &PublicId) -> AuditRecord {
        AuditRecord::new(op, "binding", id.clone(), self.scope_id.clone())
            .field("value", Classification::Sensitive, json_str(&self.value))
            .field("name", Classification::Public, json_opt(self.name.as_deref()))
            .field(
                "description",
                Classification::Public,
                json_opt(self.description.as_deref()),
            )
            .field(
                "target_id",
                Classification::Public,
                json_opt(self.target_id.as_ref().map(PublicId::as_str)),
            )
            .field("version", Classification::Public, Value::from(self.version))
    }
}

fn parse_col<T>(idx: usize, parsed: Result<T, quill_types::IdError>) -> rusqlite::Result<T> {
    parsed.map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn json_str(s: &str) -> Value {
    Value::String(s.to_string())
}

fn json_opt(s: Option<&str>) -> Value {
    match s {
        Some(s) => Value::String(s.to_string()),
        None => Value::Null,
    }
}

/// The attributes a field mask may name. Unknown names are rejected at
/// parse time with [`RepoError::InvalidFieldMask`]; once parsed, masks
/// cannot carry unrecognized entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingField {
    Value,
    Name,
    Description,
    TargetId,
}

impl BindingField {
    /// Every maskable field.
    pub const ALL: [Self; 4] = [Self::Value, Self::Name, Self::Description, Self::TargetId];

    /// The column this field maps to.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Name => "name",
            Self::Description => "description",
            Self::TargetId => "target_id",
        }
    }

    /// Parses one mask entry, case-insensitively.
    pub fn parse(name: &str) -> RepoResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "value" => Ok(Self::Value),
            "name" => Ok(Self::Name),
            "description" => Ok(Self::Description),
            "target_id" | "targetid" => Ok(Self::TargetId),
            _ => Err(RepoError::InvalidFieldMask(name.to_string())),
        }
    }
}

/// Parses a caller-supplied string mask, failing fast on the first
/// unrecognized entry.
pub fn parse_field_mask(names: &[&str]) -> RepoResult<Vec<BindingField>> {
    names.iter().map(|n| BindingField::parse(n)).collect()
}
