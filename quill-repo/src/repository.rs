//! The repository core: create/update/delete/lookup/list for bindings.
//!
//! Every mutation follows the same shape: validate the caller's input,
//! obtain the scope's audit key wrapper (failure aborts before any
//! transaction opens), then run exactly one immediate transaction that
//! performs the row change and appends the encrypted audit record.
//! Timestamps always come from the database clock inside that
//! transaction, never from the caller.

use crate::binding::{Binding, BindingField, BINDING_PREFIX};
use crate::config::RepositoryConfig;
use crate::cursor::{ListOptions, Page, PageCursor};
use crate::error::{RepoError, RepoResult};
use crate::schema;
use quill_audit::{AuditOp, AuditTrail, StoredRecord, AUDIT_SCHEMA};
use quill_crypto::{KeyProvider, KeyPurpose};
use quill_db::{reader, Db, RetryPolicy};
use quill_types::{IdGenerator, PublicId, ScopeId};
use rusqlite::{params, types::Value as SqlValue, Connection};
use std::sync::Arc;
use tracing::debug;

/// Versioned, audited repository over the binding table.
pub struct Repository {
    db: Db,
    keys: Arc<dyn KeyProvider>,
    ids: Arc<dyn IdGenerator>,
    config: RepositoryConfig,
}

impl Repository {
    /// Creates a repository, initializing the binding and audit schemas.
    pub fn new(
        db: Db,
        keys: Arc<dyn KeyProvider>,
        ids: Arc<dyn IdGenerator>,
        config: RepositoryConfig,
    ) -> RepoResult<Self> {
        db.execute_batch(schema::SCHEMA)?;
        db.execute_batch(AUDIT_SCHEMA)?;
        Ok(Self {
            db,
            keys,
            ids,
            config,
        })
    }

    /// The underlying database handle.
    #[must_use]
    pub fn db(&self) -> &Db {
        &self.db
    }

    pub(crate) fn retry(&self) -> &RetryPolicy {
        &self.config.retry
    }

    /// Inserts `b` and returns the stored row with its server-assigned
    /// public id, version 1, and timestamps. `b` must carry an empty
    /// public id, a non-empty value, and its owning scope; name,
    /// description, and target are optional. The value must be globally
    /// unique and the name unique within the scope.
    pub fn create_binding(&self, b: &Binding) -> RepoResult<Binding> {
        if b.public_id.is_some() {
            return Err(RepoError::InvalidParameter(
                "public id must be empty".to_string(),
            ));
        }
        if b.value.is_empty() {
            return Err(RepoError::InvalidParameter("no value".to_string()));
        }

        let wrapper = self.keys.get_wrapper(&b.scope_id, KeyPurpose::Audit)?;
        let id = self.ids.new_id(BINDING_PREFIX)?;

        let created = self
            .db
            .run_in_transaction(&self.config.retry, |tx| {
                let now = reader::now(tx)?;
                tx.execute(
                    "INSERT INTO binding
                       (public_id, scope_id, value, name, description, target_id,
                        version, create_time, update_time)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)",
                    params![
                        id.as_str(),
                        b.scope_id.as_str(),
                        b.value,
                        none_if_empty(b.name.as_deref()),
                        none_if_empty(b.description.as_deref()),
                        b.target_id.as_ref().map(PublicId::as_str),
                        now.as_millis(),
                    ],
                )?;
                let created = lookup_row(tx, &id)?
                    .ok_or_else(|| RepoError::NotFound(format!("binding {id} vanished mid-create")))?;
                AuditTrail::append(tx, wrapper.as_ref(), &created.audit_record(AuditOp::Create, &id), now)?;
                Ok(created)
            })
            .map_err(|e| self.name_constraint_error(e, b))?;

        debug!(public_id = %id, scope = %b.scope_id, "binding created");
        Ok(created)
    }

    /// Updates the masked fields of the binding identified by
    /// `b.public_id`, guarded by the caller's expected version. Returns
    /// the updated row and the number of rows affected.
    ///
    /// For each masked field, a non-empty value is written and an empty
    /// one explicitly nulls the column: "not provided" means "leave the
    /// field out of the mask", never "set to empty". `value` can be
    /// replaced but not nulled.
    ///
    /// A stale `expected_version` fails with [`RepoError::Conflict`] and
    /// mutates nothing; the caller re-reads and decides whether to
    /// resubmit. The conflict is deliberately excluded from the
    /// transient-retry budget.
    pub fn update_binding(
        &self,
        b: &Binding,
        expected_version: u32,
        mask: &[BindingField],
    ) -> RepoResult<(Binding, usize)> {
        let Some(id) = b.public_id.clone() else {
            return Err(RepoError::InvalidParameter("no public id".to_string()));
        };
        if expected_version == 0 {
            return Err(RepoError::InvalidParameter("no version".to_string()));
        }
        if mask.is_empty() {
            return Err(RepoError::EmptyFieldMask);
        }

        let mut set_cols: Vec<(&'static str, SqlValue)> = Vec::new();
        let mut null_cols: Vec<&'static str> = Vec::new();
        for field in mask {
            let supplied = match field {
                BindingField::Value => {
                    if b.value.is_empty() {
                        return Err(RepoError::InvalidParameter(
                            "value cannot be empty".to_string(),
                        ));
                    }
                    Some(b.value.clone())
                }
                BindingField::Name => none_if_empty(b.name.as_deref()).map(str::to_string),
                BindingField::Description => {
                    none_if_empty(b.description.as_deref()).map(str::to_string)
                }
                BindingField::TargetId => b.target_id.as_ref().map(|t| t.as_str().to_string()),
            };
            match supplied {
                Some(v) => set_cols.push((field.column(), SqlValue::Text(v))),
                None => null_cols.push(field.column()),
            }
        }

        let wrapper = self.keys.get_wrapper(&b.scope_id, KeyPurpose::Audit)?;

        let updated = self
            .db
            .run_in_transaction(&self.config.retry, |tx| {
                let now = reader::now(tx)?;

                let mut sql =
                    String::from("UPDATE binding SET version = version + 1, update_time = ?");
                let mut args: Vec<SqlValue> = vec![SqlValue::Integer(now.as_millis())];
                for (col, v) in &set_cols {
                    sql.push_str(&format!(", {col} = ?"));
                    args.push(v.clone());
                }
                for col in &null_cols {
                    sql.push_str(&format!(", {col} = NULL"));
                }
                sql.push_str(" WHERE public_id = ? AND version = ?");
                args.push(SqlValue::Text(id.as_str().to_string()));
                args.push(SqlValue::Integer(i64::from(expected_version)));

                let rows = tx.execute(&sql, rusqlite::params_from_iter(args))?;
                match rows {
                    0 => {
                        // The version predicate filtered the row out, or
                        // it no longer exists. Distinguish in the same
                        // transaction.
                        return match lookup_row(tx, &id)? {
                            Some(_) => Err(RepoError::Conflict),
                            None => {
                                Err(RepoError::NotFound(format!("binding {id} was not found")))
                            }
                        };
                    }
                    1 => {}
                    _ => return Err(RepoError::MultipleRecords("updated")),
                }

                let updated = lookup_row(tx, &id)?
                    .ok_or_else(|| RepoError::NotFound(format!("binding {id} was not found")))?;
                AuditTrail::append(tx, wrapper.as_ref(), &updated.audit_record(AuditOp::Update, &id), now)?;
                Ok((updated, rows))
            })
            .map_err(|e| self.name_constraint_error(e, b))?;

        debug!(public_id = %id, version = updated.0.version, "binding updated");
        Ok(updated)
    }

    /// Deletes the binding for `id`, returning the number of rows
    /// deleted. Idempotent: a missing id returns 0 and no error. The
    /// tombstone and audit record are written in the same transaction as
    /// the delete.
    pub fn delete_binding(&self, id: &PublicId) -> RepoResult<usize> {
        let Some(existing) = self.lookup_binding(id)? else {
            return Ok(0);
        };

        let wrapper = self.keys.get_wrapper(&existing.scope_id, KeyPurpose::Audit)?;

        let rows = self.db.run_in_transaction(&self.config.retry, |tx| {
            let now = reader::now(tx)?;
            // Snapshot inside the transaction: the audit record must
            // describe the row as it dies, not as it was first observed.
            let Some(current) = lookup_row(tx, id)? else {
                // Deleted concurrently since the lookup; still a success.
                return Ok(0);
            };
            let rows = tx.execute("DELETE FROM binding WHERE public_id = ?1", [id.as_str()])?;
            match rows {
                0 => return Ok(0),
                1 => {}
                _ => return Err(RepoError::MultipleRecords("deleted")),
            }
            tx.execute(
                "INSERT OR REPLACE INTO binding_deleted (public_id, delete_time) VALUES (?1, ?2)",
                params![id.as_str(), now.as_millis()],
            )?;
            AuditTrail::append(tx, wrapper.as_ref(), &current.audit_record(AuditOp::Delete, id), now)?;
            Ok(rows)
        })?;

        debug!(public_id = %id, rows, "binding deleted");
        Ok(rows)
    }

    /// Returns the binding for `id`, or `Ok(None)` if there is none.
    pub fn lookup_binding(&self, id: &PublicId) -> RepoResult<Option<Binding>> {
        self.db.with_conn(|conn| lookup_row(conn, id))
    }

    /// Lists bindings in `scope` in `(update_time, public_id)` order,
    /// resuming after `opts.after` when set. The page size is
    /// `opts.limit` or the repository default; listing is never
    /// unbounded.
    pub fn list_bindings(&self, scope: &ScopeId, opts: &ListOptions) -> RepoResult<Page> {
        let limit = opts.limit.unwrap_or(self.config.default_page_limit).max(1);

        self.db.with_conn(|conn| {
            let mut sql = format!(
                "SELECT {} FROM binding WHERE scope_id = ?",
                Binding::COLUMNS
            );
            let mut args: Vec<SqlValue> = vec![SqlValue::Text(scope.as_str().to_string())];
            if let Some(cursor) = &opts.after {
                sql.push_str(
                    " AND (update_time > ? OR (update_time = ? AND public_id > ?))",
                );
                args.push(SqlValue::Integer(cursor.update_time.as_millis()));
                args.push(SqlValue::Integer(cursor.update_time.as_millis()));
                args.push(SqlValue::Text(cursor.public_id.as_str().to_string()));
            }
            sql.push_str(" ORDER BY update_time ASC, public_id ASC LIMIT ?");
            args.push(SqlValue::Integer(limit as i64));

            let mut stmt = conn.prepare(&sql)?;
            let bindings = stmt
                .query_map(rusqlite::params_from_iter(args), Binding::from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            let next = bindings.last().and_then(PageCursor::from_item);
            Ok(Page { bindings, next })
        })
    }

    /// Loads and decrypts the audit records for `scope`, newest first.
    pub fn load_audit(
        &self,
        scope: &ScopeId,
        limit: usize,
        offset: usize,
    ) -> RepoResult<Vec<StoredRecord>> {
        let wrapper = self.keys.get_wrapper(scope, KeyPurpose::Audit)?;
        self.db
            .with_conn(|conn| Ok(AuditTrail::load(conn, wrapper.as_ref(), scope, limit, offset)?))
    }

    /// Rewrites generic constraint errors with the uniqueness domain
    /// (value vs. name) or the dangling target reference named, the way
    /// a caller needs to hear them.
    fn name_constraint_error(&self, e: RepoError, b: &Binding) -> RepoError {
        match e {
            RepoError::AlreadyExists { domain, .. } if domain.contains("value") => {
                RepoError::AlreadyExists {
                    message: format!("binding value {:?} is already in use", b.value),
                    domain,
                }
            }
            RepoError::AlreadyExists { domain, .. } if domain.contains("name") => {
                RepoError::AlreadyExists {
                    message: format!(
                        "in scope {}, the name {:?} is already in use",
                        b.scope_id,
                        b.name.as_deref().unwrap_or_default()
                    ),
                    domain,
                }
            }
            RepoError::NotFound(msg)
                if msg.contains("missing referenced row") && b.target_id.is_some() =>
            {
                RepoError::NotFound(format!(
                    "target with specified id {:?} was not found",
                    b.target_id.as_ref().map(PublicId::as_str).unwrap_or_default()
                ))
            }
            other => other,
        }
    }
}

/// Reads one binding row by public id. `Ok(None)` on a miss.
fn lookup_row(conn: &Connection, id: &PublicId) -> RepoResult<Option<Binding>> {
    let sql = format!(
        "SELECT {} FROM binding WHERE public_id = ?1",
        Binding::COLUMNS
    );
    match conn.query_row(&sql, [id.as_str()], Binding::from_row) {
        Ok(b) => Ok(Some(b)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn none_if_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
