//! Pending feedback tasks and their archive.
//!
//! A task is a candidate card sent to one manager/admin after an interview.
//! A final decision by any recipient resolves every task for that candidate:
//! the rows move to `feedback_history` and the other recipients are notified
//! by the caller using the returned rows.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::error::AppResult;

#[derive(Debug, Clone)]
pub struct PendingFeedback {
    pub feedback_id: String,
    pub manager_id: i64,
    pub message_id: i64,
    pub candidate_id: i64,
    pub candidate_name: String,
    pub job_data_json: String,
    pub created_at: String,
}

pub fn create_pending_feedback(
    conn: &Connection,
    feedback_id: &str,
    manager_id: i64,
    message_id: i64,
    candidate_id: i64,
    candidate_name: &str,
    job_data_json: &str,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO pending_feedback
         (feedback_id, manager_id, message_id, candidate_id, candidate_name, job_data_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            feedback_id,
            manager_id,
            message_id,
            candidate_id,
            candidate_name,
            job_data_json,
            Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

pub fn get_pending_feedback(conn: &Connection, feedback_id: &str) -> AppResult<Option<PendingFeedback>> {
    let task = conn
        .query_row(
            "SELECT feedback_id, manager_id, message_id, candidate_id, candidate_name, job_data_json, created_at
             FROM pending_feedback WHERE feedback_id = ?1",
            params![feedback_id],
            row_to_task,
        )
        .optional()?;
    Ok(task)
}

/// Open tasks assigned to one recipient, oldest first.
pub fn pending_for_manager(conn: &Connection, manager_id: i64) -> AppResult<Vec<PendingFeedback>> {
    let mut stmt = conn.prepare(
        "SELECT feedback_id, manager_id, message_id, candidate_id, candidate_name, job_data_json, created_at
         FROM pending_feedback WHERE manager_id = ?1 ORDER BY created_at",
    )?;
    let rows = stmt
        .query_map(params![manager_id], row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Archives every open task for a candidate under a final status.
///
/// Returns the moved rows so the caller can notify the other recipients and
/// strip the keyboards from their task messages. Safe to call twice: the
/// second call finds nothing and moves nothing.
pub fn move_to_history(
    conn: &Connection,
    candidate_id: i64,
    decision_by: i64,
    status: &str,
) -> AppResult<Vec<PendingFeedback>> {
    let mut stmt = conn.prepare(
        "SELECT feedback_id, manager_id, message_id, candidate_id, candidate_name, job_data_json, created_at
         FROM pending_feedback WHERE candidate_id = ?1",
    )?;
    let moved = stmt
        .query_map(params![candidate_id], row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;

    let decision_at = Utc::now().to_rfc3339();
    for task in &moved {
        conn.execute(
            "INSERT INTO feedback_history
             (feedback_id, manager_id, candidate_id, candidate_name, job_data_json, created_at,
              decision_at, decision_by, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                task.feedback_id,
                task.manager_id,
                task.candidate_id,
                task.candidate_name,
                task.job_data_json,
                task.created_at,
                decision_at,
                decision_by,
                status
            ],
        )?;
    }
    conn.execute("DELETE FROM pending_feedback WHERE candidate_id = ?1", params![candidate_id])?;

    Ok(moved)
}

pub fn history_count_by_status(conn: &Connection) -> AppResult<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(DISTINCT candidate_id) FROM feedback_history GROUP BY status ORDER BY status",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Wipes everything stored about a user.
///
/// Used both when a candidate is rejected and when a user blocks the bot.
pub fn delete_user_data(conn: &Connection, user_id: i64) -> AppResult<()> {
    conn.execute("DELETE FROM employees WHERE user_id = ?1", params![user_id])?;
    conn.execute("DELETE FROM pending_feedback WHERE candidate_id = ?1", params![user_id])?;
    conn.execute("DELETE FROM surveys WHERE user_id = ?1", params![user_id])?;
    conn.execute("DELETE FROM dialogs WHERE chat_id = ?1", params![user_id])?;
    Ok(())
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<PendingFeedback> {
    Ok(PendingFeedback {
        feedback_id: row.get(0)?,
        manager_id: row.get(1)?,
        message_id: row.get(2)?,
        candidate_id: row.get(3)?,
        candidate_name: row.get(4)?,
        job_data_json: row.get(5)?,
        created_at: row.get(6)?,
    })
}
