//! Employees and candidates. Candidates are registered inactive after an
//! interview and become active on an onboarding decision.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::error::AppResult;

#[derive(Debug, Clone)]
pub struct Employee {
    pub user_id: i64,
    pub restaurant_code: String,
    pub full_name: String,
    pub position: String,
    pub hired_at: String,
    pub is_active: bool,
}

pub fn upsert_employee(
    conn: &Connection,
    user_id: i64,
    restaurant_code: &str,
    full_name: &str,
    position: &str,
    is_active: bool,
) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO employees (user_id, restaurant_code, full_name, position, hired_at, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user_id,
            restaurant_code,
            full_name,
            position,
            Utc::now().to_rfc3339(),
            is_active as i64
        ],
    )?;
    Ok(())
}

pub fn get_employee(conn: &Connection, user_id: i64, restaurant_code: &str) -> AppResult<Option<Employee>> {
    let employee = conn
        .query_row(
            "SELECT user_id, restaurant_code, full_name, position, hired_at, is_active
             FROM employees WHERE user_id = ?1 AND restaurant_code = ?2",
            params![user_id, restaurant_code],
            row_to_employee,
        )
        .optional()?;
    Ok(employee)
}

/// Restaurant code of the user's (most recent) employee row, if any.
pub fn restaurant_for_user(conn: &Connection, user_id: i64) -> AppResult<Option<String>> {
    let code = conn
        .query_row(
            "SELECT restaurant_code FROM employees WHERE user_id = ?1 ORDER BY hired_at DESC LIMIT 1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(code)
}

/// Flips the active flag across all of the user's restaurant rows.
pub fn set_employee_active(conn: &Connection, user_id: i64, is_active: bool) -> AppResult<bool> {
    let updated = conn.execute(
        "UPDATE employees SET is_active = ?2 WHERE user_id = ?1",
        params![user_id, is_active as i64],
    )?;
    Ok(updated > 0)
}

/// One page of the employee list plus the total row count.
pub fn list_employees_page(conn: &Connection, page: usize, per_page: usize) -> AppResult<(Vec<Employee>, usize)> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM employees", [], |row| row.get(0))?;

    let mut stmt = conn.prepare(
        "SELECT user_id, restaurant_code, full_name, position, hired_at, is_active
         FROM employees ORDER BY restaurant_code, full_name
         LIMIT ?1 OFFSET ?2",
    )?;
    let rows = stmt
        .query_map(params![per_page as i64, (page * per_page) as i64], row_to_employee)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((rows, total as usize))
}

/// Chat ids of active employees, used for climate survey broadcasts.
pub fn active_employee_ids(conn: &Connection) -> AppResult<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT DISTINCT user_id FROM employees WHERE is_active = 1")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Employee counts per restaurant, split into active/inactive.
pub fn employee_stats(conn: &Connection) -> AppResult<Vec<(String, i64, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT restaurant_code,
                SUM(CASE WHEN is_active = 1 THEN 1 ELSE 0 END),
                SUM(CASE WHEN is_active = 0 THEN 1 ELSE 0 END)
         FROM employees GROUP BY restaurant_code ORDER BY restaurant_code",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn row_to_employee(row: &rusqlite::Row<'_>) -> rusqlite::Result<Employee> {
    Ok(Employee {
        user_id: row.get(0)?,
        restaurant_code: row.get(1)?,
        full_name: row.get(2)?,
        position: row.get(3)?,
        hired_at: row.get(4)?,
        is_active: row.get::<_, i64>(5)? != 0,
    })
}
