//! Schema migrations, embedded at compile time and applied on pool creation.

use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::Connection;

mod embedded {
    refinery::embed_migrations!("./migrations");
}

/// Serializes migration runs within this process. Across processes the
/// BEGIN IMMEDIATE below does the same through the SQLite write lock.
static MIGRATION_GATE: OnceLock<Mutex<()>> = OnceLock::new();

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let gate = MIGRATION_GATE.get_or_init(Mutex::default);
    // Poison means a sibling thread panicked mid-run. Refinery skips
    // versions it already applied, so taking over is safe.
    let _guard = gate.lock().unwrap_or_else(|poisoned| {
        log::warn!("Recovering poisoned migration gate");
        poisoned.into_inner()
    });

    conn.busy_timeout(Duration::from_secs(30))
        .context("set SQLite busy timeout")?;
    conn.execute_batch("BEGIN IMMEDIATE")
        .context("take SQLite write lock for migration")?;

    match embedded::migrations::runner().run(conn) {
        Ok(report) => {
            let applied = report.applied_migrations().len();
            if applied > 0 {
                log::info!("Applied {} schema migration(s)", applied);
            }
            conn.execute_batch("COMMIT").context("commit migrations")
        }
        Err(err) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(err).context("apply migrations")
        }
    }
}
