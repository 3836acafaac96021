//! Deletion-tombstone listing for incremental resynchronization.

use crate::error::RepoResult;
use crate::repository::Repository;
use quill_db::reader;
use quill_types::{PublicId, Timestamp};

/// Result of [`Repository::list_deleted_ids`]: the ids deleted since the
/// caller's watermark, plus the new watermark to use next time.
#[derive(Debug)]
pub struct DeletedIds {
    pub ids: Vec<PublicId>,
    /// Transaction-observed "now". Everything deleted up to here is in
    /// `ids`; pass it back as `since` on the next incremental call.
    pub watermark: Timestamp,
}

impl Repository {
    /// Lists the public ids of bindings deleted at or after `since`.
    ///
    /// The tombstone query and the watermark read run inside one
    /// immediate transaction. Capturing the watermark inside that
    /// transaction (rather than before or after it) is what closes the
    /// race where a deletion committing between a naive clock read and
    /// the query would be missed by the next incremental call.
    pub fn list_deleted_ids(&self, since: Timestamp) -> RepoResult<DeletedIds> {
        self.db().run_in_transaction(self.retry(), |tx| {
            let mut stmt = tx.prepare(
                "SELECT public_id FROM binding_deleted
                 WHERE delete_time >= ?1 ORDER BY delete_time ASC",
            )?;
            let raw = stmt
                .query_map([since.as_millis()], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            let ids = raw
                .iter()
                .map(|s| PublicId::parse(s))
                .collect::<Result<Vec<_>, _>>()?;
            let watermark = reader::now(tx)?;
            Ok(DeletedIds { ids, watermark })
        })
    }

    /// Returns an approximate count of binding rows: a planner-statistics
    /// estimate when available, never an authoritative count. Intended
    /// only to help a caller decide between incremental merge and full
    /// resync.
    pub fn estimated_count(&self) -> RepoResult<i64> {
        self.db()
            .with_conn(|conn| Ok(reader::estimated_count(conn, "binding")?))
    }
}
