use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: kadrovik.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "kadrovik.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: kadrovik.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "kadrovik.log".to_string()));

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// PID file used for stale-instance detection and by the supervisor
/// Read from PID_FILE environment variable
pub static PID_FILE: Lazy<String> = Lazy::new(|| env::var("PID_FILE").unwrap_or_else(|_| "kadrovik.pid".to_string()));

/// Heartbeat marker file, refreshed by the heartbeat task
/// Read from HEARTBEAT_FILE environment variable
pub static HEARTBEAT_FILE: Lazy<String> =
    Lazy::new(|| env::var("HEARTBEAT_FILE").unwrap_or_else(|_| "heartbeat.txt".to_string()));

/// Ping marker file, touched on every /ping request
/// Read from PING_FILE environment variable
pub static PING_FILE: Lazy<String> = Lazy::new(|| env::var("PING_FILE").unwrap_or_else(|_| "ping.txt".to_string()));

/// Spreadsheet gateway endpoint. The outbox writer POSTs row batches here.
/// Read from SHEETS_API_URL environment variable. Empty = writer disabled.
pub static SHEETS_API_URL: Lazy<String> =
    Lazy::new(|| env::var("SHEETS_API_URL").unwrap_or_else(|_| String::new()));

/// Bearer token for the spreadsheet gateway
/// Read from SHEETS_API_TOKEN environment variable
pub static SHEETS_API_TOKEN: Lazy<String> =
    Lazy::new(|| env::var("SHEETS_API_TOKEN").unwrap_or_else(|_| String::new()));

/// Restaurants of the chain: `code:Название` pairs, comma-separated.
/// Read from RESTAURANTS environment variable.
pub static RESTAURANTS: Lazy<Vec<(String, String)>> = Lazy::new(|| {
    let raw = env::var("RESTAURANTS")
        .unwrap_or_else(|_| "tve:Тверская,arb:Арбат,sit:Москва-Сити".to_string());
    raw.split(',')
        .filter_map(|pair| {
            let (code, name) = pair.split_once(':')?;
            let code = code.trim();
            let name = name.trim();
            if code.is_empty() || name.is_empty() {
                None
            } else {
                Some((code.to_string(), name.to_string()))
            }
        })
        .collect()
});

/// Human-readable restaurant name for a code, falling back to the code itself.
pub fn restaurant_name(code: &str) -> String {
    RESTAURANTS
        .iter()
        .find(|(c, _)| c == code)
        .map(|(_, name)| name.clone())
        .unwrap_or_else(|| code.to_string())
}

/// Admin configuration
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    fn parse_admin_ids(raw: &str) -> Vec<i64> {
        raw.split([',', ' ', '\n', '\t'])
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect()
    }

    /// Admin user IDs (comma-separated)
    /// Read from ADMIN_IDS environment variable
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .ok()
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default()
    });

    /// Returns true if the user is a configured administrator.
    pub fn is_admin(user_id: i64) -> bool {
        ADMIN_IDS.contains(&user_id)
    }
}

/// Outbox queue configuration
pub mod queue {
    use super::Duration;

    /// Interval between drain passes (in seconds)
    pub const BATCH_INTERVAL_SECS: u64 = 30;

    /// Maximum rows read per drain pass
    pub const BATCH_LIMIT: usize = 50;

    /// Write attempts per row before it is parked and admins are alerted
    pub const MAX_WRITE_ATTEMPTS: i64 = 3;

    /// Drain pass interval duration
    pub fn batch_interval() -> Duration {
        Duration::from_secs(BATCH_INTERVAL_SECS)
    }
}

/// Heartbeat configuration
pub mod heartbeat {
    use super::Duration;

    /// Interval between heartbeat file refreshes (in seconds)
    pub const INTERVAL_SECS: u64 = 30;

    /// Heartbeat interval duration
    pub fn interval() -> Duration {
        Duration::from_secs(INTERVAL_SECS)
    }
}

/// Liveness endpoint configuration
pub mod ping {
    use once_cell::sync::Lazy;
    use std::env;

    /// Port for the local /ping HTTP server
    /// Read from PING_PORT environment variable
    /// Default: 8888
    pub static PORT: Lazy<u16> = Lazy::new(|| {
        env::var("PING_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8888)
    });
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for HTTP requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Answer validation limits
pub mod validation {
    /// Minimum number of words in a full name
    pub const MIN_NAME_WORDS: usize = 2;

    /// Accepted age range for candidates
    pub const MIN_AGE: u32 = 16;
    pub const MAX_AGE: u32 = 100;

    /// Minimum length for essay-style answers (in characters)
    pub const MIN_ANSWER_LEN: usize = 10;
}

/// Admin panel pagination
pub mod pagination {
    /// Employees shown per page
    pub const EMPLOYEES_PER_PAGE: usize = 15;
}

/// Scheduled follow-up configuration
pub mod followup {
    use super::Duration;

    /// Delay before asking a candidate how the interview with the bot went
    pub const CANDIDATE_FEEDBACK_DELAY_SECS: u64 = 1800;

    /// Fallback delay for the no-show check when the shift date cannot be parsed
    pub const NOSHOW_FALLBACK_DELAY_SECS: u64 = 86400;

    /// Days an exit interview stays on cooldown per user
    pub const EXIT_COOLDOWN_DAYS: i64 = 7;

    pub fn candidate_feedback_delay() -> Duration {
        Duration::from_secs(CANDIDATE_FEEDBACK_DELAY_SECS)
    }

    pub fn noshow_fallback_delay() -> Duration {
        Duration::from_secs(NOSHOW_FALLBACK_DELAY_SECS)
    }
}

/// Spreadsheet tab names the outbox routes rows to
pub mod sheet {
    pub const INTERVIEWS: &str = "Собеседования";
    pub const MANAGER_DECISIONS: &str = "Решения менеджеров";
    pub const ONBOARDING: &str = "Адаптация";
    pub const EXIT_INTERVIEWS: &str = "Выходные интервью";
    pub const CLIMATE: &str = "Климат";
    pub const CANDIDATE_FEEDBACK: &str = "Оценка бота";
    pub const NOSHOW: &str = "Невыходы";
    pub const BOT_FEEDBACK: &str = "Отзывы о боте";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restaurant_name_falls_back_to_code() {
        assert_eq!(restaurant_name("no-such-code"), "no-such-code");
    }

    #[test]
    fn test_default_restaurants_parse() {
        assert!(!RESTAURANTS.is_empty());
        assert!(RESTAURANTS.iter().all(|(c, n)| !c.is_empty() && !n.is_empty()));
    }
}
