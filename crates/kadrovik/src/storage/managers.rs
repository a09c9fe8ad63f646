//! Manager records and registration requests awaiting admin approval.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::error::AppResult;

/// Менеджер ресторана, подтверждённый администратором.
#[derive(Debug, Clone)]
pub struct Manager {
    pub user_id: i64,
    pub restaurant_code: String,
    pub full_name: String,
    pub registered_at: String,
}

/// Заявка на регистрацию менеджера, ожидающая решения администратора.
#[derive(Debug, Clone)]
pub struct PendingManager {
    pub user_id: i64,
    pub restaurant_code: String,
    pub full_name: String,
    pub requested_at: String,
}

/// Adds (or re-adds) a confirmed manager. One row per user+restaurant.
pub fn add_manager(conn: &Connection, user_id: i64, restaurant_code: &str, full_name: &str) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO managers (user_id, restaurant_code, full_name, registered_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id, restaurant_code, full_name, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn remove_manager(conn: &Connection, user_id: i64, restaurant_code: &str) -> AppResult<bool> {
    let removed = conn.execute(
        "DELETE FROM managers WHERE user_id = ?1 AND restaurant_code = ?2",
        params![user_id, restaurant_code],
    )?;
    Ok(removed > 0)
}

pub fn is_manager(conn: &Connection, user_id: i64) -> AppResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM managers WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Managers attached to a restaurant, used for candidate fan-out.
pub fn managers_for_restaurant(conn: &Connection, restaurant_code: &str) -> AppResult<Vec<Manager>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, restaurant_code, full_name, registered_at
         FROM managers WHERE restaurant_code = ?1 ORDER BY registered_at",
    )?;
    let rows = stmt
        .query_map(params![restaurant_code], row_to_manager)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Stores a registration request, replacing any previous one from the user.
pub fn add_pending_manager(conn: &Connection, user_id: i64, restaurant_code: &str, full_name: &str) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO pending_managers (user_id, restaurant_code, full_name, requested_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id, restaurant_code, full_name, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Removes and returns a pending request. Returns None when the request is
/// already resolved, which makes approve/reject idempotent across admins.
pub fn take_pending_manager(conn: &Connection, user_id: i64) -> AppResult<Option<PendingManager>> {
    let pending = conn
        .query_row(
            "SELECT user_id, restaurant_code, full_name, requested_at
             FROM pending_managers WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(PendingManager {
                    user_id: row.get(0)?,
                    restaurant_code: row.get(1)?,
                    full_name: row.get(2)?,
                    requested_at: row.get(3)?,
                })
            },
        )
        .optional()?;

    if pending.is_some() {
        conn.execute("DELETE FROM pending_managers WHERE user_id = ?1", params![user_id])?;
    }

    Ok(pending)
}

pub fn list_pending_managers(conn: &Connection) -> AppResult<Vec<PendingManager>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, restaurant_code, full_name, requested_at
         FROM pending_managers ORDER BY requested_at",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PendingManager {
                user_id: row.get(0)?,
                restaurant_code: row.get(1)?,
                full_name: row.get(2)?,
                requested_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn row_to_manager(row: &rusqlite::Row<'_>) -> rusqlite::Result<Manager> {
    Ok(Manager {
        user_id: row.get(0)?,
        restaurant_code: row.get(1)?,
        full_name: row.get(2)?,
        registered_at: row.get(3)?,
    })
}
