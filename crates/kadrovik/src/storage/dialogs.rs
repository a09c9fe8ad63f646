//! Raw persistence for per-chat dialog state.
//!
//! The typed layer lives in `telegram::state::DialogStore`; this module only
//! moves JSON text in and out of the `dialogs` table.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::error::AppResult;

pub fn save_dialog(conn: &Connection, chat_id: i64, state_json: &str) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO dialogs (chat_id, state_json, updated_at) VALUES (?1, ?2, ?3)",
        params![chat_id, state_json, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn load_dialog(conn: &Connection, chat_id: i64) -> AppResult<Option<String>> {
    let state = conn
        .query_row(
            "SELECT state_json FROM dialogs WHERE chat_id = ?1",
            params![chat_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(state)
}

pub fn clear_dialog(conn: &Connection, chat_id: i64) -> AppResult<()> {
    conn.execute("DELETE FROM dialogs WHERE chat_id = ?1", params![chat_id])?;
    Ok(())
}
