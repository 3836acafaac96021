//! Table DDL for the binding repository.

use crate::error::RepoResult;
use quill_db::Db;
use quill_types::PublicId;
use rusqlite::params;

/// Schema for the binding table, its uniqueness domains, the tombstone
/// table, and the referenced target table.
///
/// `binding_value_uq` makes `value` globally unique;
/// `binding_scope_name_uq` makes `name` unique per scope (NULL names are
/// exempt, names are optional). `binding_update_ix` backs the keyset
/// pagination order.
pub(crate) const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS target (
        public_id TEXT PRIMARY KEY
    );

    CREATE TABLE IF NOT EXISTS binding (
        public_id   TEXT PRIMARY KEY,
        scope_id    TEXT NOT NULL,
        value       TEXT NOT NULL,
        name        TEXT,
        description TEXT,
        target_id   TEXT REFERENCES target (public_id),
        version     INTEGER NOT NULL DEFAULT 1,
        create_time INTEGER NOT NULL,
        update_time INTEGER NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS binding_value_uq ON binding (value);
    CREATE UNIQUE INDEX IF NOT EXISTS binding_scope_name_uq ON binding (scope_id, name);
    CREATE INDEX IF NOT EXISTS binding_update_ix ON binding (update_time, public_id);

    CREATE TABLE IF NOT EXISTS binding_deleted (
        public_id   TEXT PRIMARY KEY,
        delete_time INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS binding_deleted_time_ix ON binding_deleted (delete_time);
";

/// Inserts a target row. Targets are provisioned by their owning
/// subsystem; this helper exists for embedders and tests that need a
/// referenceable destination.
pub fn provision_target(db: &Db, id: &PublicId) -> RepoResult<()> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT OR IGNORE INTO target (public_id) VALUES (?1)",
            params![id.as_str()],
        )?;
        Ok(())
    })
}
