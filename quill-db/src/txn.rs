//! Transaction retry driver.
//!
//! Every mutation runs as a unit of work: a closure over one immediate
//! transaction, executed by this driver. Transient contention retries
//! with exponential backoff; domain errors (version conflicts, constraint
//! violations, integrity failures) abort on the first attempt.

use crate::error::Transient;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Duration;
use tracing::warn;

/// Bounded retry policy for transient transaction failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts after the first (0 disables retrying).
    pub max_retries: u32,
    /// Backoff before the first retry; doubles per attempt.
    pub base_backoff: Duration,
    /// Ceiling on the per-attempt backoff.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 8,
            base_backoff: Duration::from_millis(2),
            max_backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(1u32 << attempt.min(16))
            .min(self.max_backoff)
    }
}

/// Runs `f` inside an immediate transaction, retrying per `policy`.
pub(crate) fn run_in_transaction<T, E>(
    conn: &mut Connection,
    policy: &RetryPolicy,
    f: &mut impl FnMut(&Transaction) -> Result<T, E>,
) -> Result<T, E>
where
    E: Transient + From<rusqlite::Error>,
{
    let mut attempt = 0u32;
    loop {
        match attempt_once(conn, f) {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.backoff(attempt);
                warn!(attempt, ?delay, "transaction contention, backing off");
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn attempt_once<T, E>(
    conn: &mut Connection,
    f: &mut impl FnMut(&Transaction) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<rusqlite::Error>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}
