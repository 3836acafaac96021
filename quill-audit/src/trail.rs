//! Persisting and reading back encrypted audit rows.

use crate::entry::AuditRecord;
use crate::error::AuditResult;
use quill_crypto::KeyWrapper;
use quill_types::{ScopeId, Timestamp};
use rusqlite::{params, Connection, Transaction};
use tracing::debug;

/// DDL for the audit table. Owned here; executed by whoever initializes
/// the database schema.
pub const AUDIT_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS audit_entry (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        public_id   TEXT NOT NULL,
        scope_id    TEXT NOT NULL,
        op          TEXT NOT NULL,
        record      TEXT NOT NULL,
        create_time INTEGER NOT NULL
    );
";

/// An audit record read back from storage.
#[derive(Debug)]
pub struct StoredRecord {
    pub record: AuditRecord,
    pub create_time: Timestamp,
}

/// Appends and reads encrypted audit rows.
pub struct AuditTrail;

impl AuditTrail {
    /// Encrypts `record` under `wrapper` and inserts it on the caller's
    /// open transaction. The row commits or rolls back with the mutation
    /// it describes.
    pub fn append(
        tx: &Transaction,
        wrapper: &dyn KeyWrapper,
        record: &AuditRecord,
        at: Timestamp,
    ) -> AuditResult<()> {
        let sealed = wrapper.encrypt(&record.payload()?)?;
        tx.execute(
            "INSERT INTO audit_entry (public_id, scope_id, op, record, create_time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.public_id.as_str(),
                record.scope_id.as_str(),
                record.op.to_string(),
                sealed,
                at.as_millis(),
            ],
        )?;
        debug!(op = %record.op, public_id = %record.public_id, "audit record appended");
        Ok(())
    }

    /// Loads and decrypts a scope's audit rows, newest first. The
    /// wrapper must belong to the same scope; a mismatched wrapper fails
    /// to decrypt and surfaces as an error rather than being silently
    /// skipped.
    pub fn load(
        conn: &Connection,
        wrapper: &dyn KeyWrapper,
        scope: &ScopeId,
        limit: usize,
        offset: usize,
    ) -> AuditResult<Vec<StoredRecord>> {
        let mut stmt = conn.prepare(
            "SELECT record, create_time FROM audit_entry
             WHERE scope_id = ?1 ORDER BY id DESC LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map(params![scope.as_str(), limit as i64, offset as i64], |row| {
            let sealed: String = row.get(0)?;
            let millis: i64 = row.get(1)?;
            Ok((sealed, millis))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (sealed, millis) = row?;
            let payload = wrapper.decrypt(&sealed)?;
            result.push(StoredRecord {
                record: AuditRecord::from_payload(&payload)?,
                create_time: Timestamp::from_millis(millis),
            });
        }
        Ok(result)
    }

    /// Returns the total number of audit rows.
    pub fn count(conn: &Connection) -> AuditResult<u64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM audit_entry", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
