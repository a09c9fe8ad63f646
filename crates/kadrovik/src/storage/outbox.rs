//! Durable outbox for spreadsheet writes.
//!
//! Rows are enqueued by handlers and drained by the background writer.
//! A row is processed at most once; a row that fails the attempt cap is
//! parked (left unprocessed but excluded from batches) so a flaky gateway
//! cannot alert admins about the same row twice.

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::core::error::AppResult;

#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: i64,
    pub sheet_name: String,
    pub data_json: String,
    pub created_at: String,
    pub attempts: i64,
}

/// Appends one row destined for `sheet_name`.
pub fn enqueue(conn: &Connection, sheet_name: &str, data: &serde_json::Value) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO sheets_queue (sheet_name, data_json, created_at, attempts, is_processed)
         VALUES (?1, ?2, ?3, 0, 0)",
        params![sheet_name, data.to_string(), Utc::now().to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Unprocessed rows below the attempt cap, oldest first.
pub fn fetch_batch(conn: &Connection, limit: usize, max_attempts: i64) -> AppResult<Vec<QueueItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, sheet_name, data_json, created_at, attempts
         FROM sheets_queue
         WHERE is_processed = 0 AND attempts < ?1
         ORDER BY id
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![max_attempts, limit as i64], |row| {
            Ok(QueueItem {
                id: row.get(0)?,
                sheet_name: row.get(1)?,
                data_json: row.get(2)?,
                created_at: row.get(3)?,
                attempts: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn mark_processed(conn: &Connection, ids: &[i64]) -> AppResult<()> {
    for id in ids {
        conn.execute("UPDATE sheets_queue SET is_processed = 1 WHERE id = ?1", params![id])?;
    }
    Ok(())
}

/// Bumps the attempt counter after a failed write.
///
/// Returns the ids that reached `max_attempts` with this increment. Those
/// rows just became parked, so the caller alerts admins exactly once.
pub fn increment_attempts(conn: &Connection, ids: &[i64], max_attempts: i64) -> AppResult<Vec<i64>> {
    let mut newly_parked = Vec::new();
    for id in ids {
        conn.execute(
            "UPDATE sheets_queue SET attempts = attempts + 1 WHERE id = ?1",
            params![id],
        )?;
        let attempts: i64 = conn.query_row(
            "SELECT attempts FROM sheets_queue WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if attempts == max_attempts {
            newly_parked.push(*id);
        }
    }
    Ok(newly_parked)
}

/// Rows still waiting for delivery (below the cap).
pub fn pending_count(conn: &Connection, max_attempts: i64) -> AppResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sheets_queue WHERE is_processed = 0 AND attempts < ?1",
        params![max_attempts],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Rows parked at the cap, awaiting manual inspection.
pub fn parked_count(conn: &Connection, max_attempts: i64) -> AppResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sheets_queue WHERE is_processed = 0 AND attempts >= ?1",
        params![max_attempts],
        |row| row.get(0),
    )?;
    Ok(count)
}
