//! SQLite storage layer for quill.
//!
//! Provides the pieces every store shares:
//!
//! - [`Db`]: connection management (pragmas, file or in-memory open)
//! - [`Db::run_in_transaction`]: the retry driver, where transient
//!   contention is retried with exponential backoff and domain errors
//!   abort immediately
//! - [`classify`]: maps constraint violations surfaced by SQLite into
//!   domain error kinds using structured extended result codes
//! - [`reader`]: transaction-scoped clock and approximate row counts
//!
//! Schema DDL belongs to the crates that own the tables; this crate only
//! executes it.

mod classify;
mod error;
pub mod reader;
mod txn;

pub use classify::classify;
pub use error::{DbError, DbResult, Transient};
pub use txn::RetryPolicy;

use rusqlite::{Connection, OpenFlags, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Handle to a SQLite database shared across stores.
///
/// The connection sits behind a mutex; all statement-level concurrency is
/// mediated by SQLite transactions, never by in-process locks beyond it.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    /// Opens (or creates) a database file with quill's standard pragmas:
    /// WAL journaling, foreign keys on, a busy timeout as the first line
    /// of defense against writer contention.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> DbResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Executes a batch of DDL statements (schema initialization).
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Runs a closure against the connection outside any explicit
    /// transaction. Lookup and list paths go through here; single
    /// statements are atomic on their own.
    pub fn with_conn<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        f(&conn)
    }

    /// Runs `f` inside one immediate transaction, committing on `Ok` and
    /// rolling back on `Err`. Transient failures (busy/locked) are
    /// retried per `policy` with exponential backoff; any error for which
    /// [`Transient::is_transient`] is false aborts on the first attempt.
    ///
    /// Immediate transactions take the write lock up front, so a
    /// transaction-consistent clock read inside `f` cannot race a
    /// concurrent mutation.
    pub fn run_in_transaction<T, E>(
        &self,
        policy: &RetryPolicy,
        mut f: impl FnMut(&Transaction) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: Transient + From<rusqlite::Error>,
    {
        let mut conn = self.conn.lock().expect("db mutex poisoned");
        txn::run_in_transaction(&mut conn, policy, &mut f)
    }
}
