//! Transaction-scoped read helpers: the database clock and approximate
//! row counts.

use crate::error::{DbError, DbResult};
use quill_types::Timestamp;
use rusqlite::Connection;

/// Reads the database clock (millis since epoch).
///
/// When called inside an immediate transaction this is a
/// transaction-consistent "now": the write lock is already held, so no
/// deletion can commit between this read and the statements around it.
/// That property is what makes the sync watermark safe.
pub fn now(conn: &Connection) -> DbResult<Timestamp> {
    let millis: i64 = conn.query_row(
        "SELECT CAST((julianday('now') - 2440587.5) * 86400000.0 AS INTEGER)",
        [],
        |row| row.get(0),
    )?;
    Ok(Timestamp::from_millis(millis))
}

/// Returns an approximate total row count for `table`.
///
/// Prefers the planner statistic in `sqlite_stat1` (populated by
/// `ANALYZE`, the SQLite analog of a relation-size estimate) and falls
/// back to an exact `COUNT(*)` when no statistic exists. The result is
/// advisory only: callers use it to choose between incremental merge and
/// full resync, never as an authoritative count.
pub fn estimated_count(conn: &Connection, table: &str) -> DbResult<i64> {
    if let Some(estimate) = stat1_estimate(conn, table)? {
        return Ok(estimate);
    }
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM \"{table}\""),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Reads the row estimate from `sqlite_stat1` if ANALYZE has run.
/// The `stat` column is a space-separated list whose first integer is the
/// table's row count at analysis time.
fn stat1_estimate(conn: &Connection, table: &str) -> DbResult<Option<i64>> {
    let stat: Option<String> = match conn.query_row(
        "SELECT stat FROM sqlite_stat1 WHERE tbl = ?1 LIMIT 1",
        [table],
        |row| row.get(0),
    ) {
        Ok(s) => s,
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        // sqlite_stat1 does not exist until the first ANALYZE.
        Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
            if msg.contains("no such table") =>
        {
            None
        }
        Err(e) => return Err(DbError::Sqlite(e)),
    };
    Ok(stat
        .as_deref()
        .and_then(|s| s.split_whitespace().next())
        .and_then(|n| n.parse::<i64>().ok()))
}
