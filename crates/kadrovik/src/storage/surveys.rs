//! Survey completion markers, powering cooldowns and stats.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::error::AppResult;

/// Records that a user finished a survey (replaces an earlier completion).
pub fn mark_survey_completed(conn: &Connection, survey_type: &str, user_id: i64) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO surveys (survey_type, user_id, completed_at) VALUES (?1, ?2, ?3)",
        params![survey_type, user_id, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn survey_completed_at(conn: &Connection, survey_type: &str, user_id: i64) -> AppResult<Option<DateTime<Utc>>> {
    let stamp: Option<String> = conn
        .query_row(
            "SELECT completed_at FROM surveys WHERE survey_type = ?1 AND user_id = ?2",
            params![survey_type, user_id],
            |row| row.get(0),
        )
        .optional()?;

    Ok(stamp
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

/// Completion counts grouped by survey type.
pub fn survey_counts(conn: &Connection) -> AppResult<Vec<(String, i64)>> {
    let mut stmt = conn.prepare("SELECT survey_type, COUNT(*) FROM surveys GROUP BY survey_type ORDER BY survey_type")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
