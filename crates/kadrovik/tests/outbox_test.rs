//! Integration tests for the spreadsheet outbox and its drain loop.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use kadrovik::core::config;
use kadrovik::core::error::{AppError, AppResult};
use kadrovik::sheets::writer::drain_once;
use kadrovik::sheets::SheetsClient;
use kadrovik::storage::{create_pool, get_connection, outbox, DbPool};

/// Sheets client that counts appended rows and can be switched to failing.
struct RecordingSheets {
    rows_appended: AtomicU32,
    calls: AtomicU32,
    failing: AtomicBool,
}

impl RecordingSheets {
    fn new() -> Self {
        Self {
            rows_appended: AtomicU32::new(0),
            calls: AtomicU32::new(0),
            failing: AtomicBool::new(false),
        }
    }

    fn failing() -> Self {
        let client = Self::new();
        client.failing.store(true, Ordering::SeqCst);
        client
    }
}

#[async_trait]
impl SheetsClient for RecordingSheets {
    async fn append_rows(&self, _sheet_name: &str, rows: &[serde_json::Value]) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Validation("gateway down".to_string()));
        }
        self.rows_appended.fetch_add(rows.len() as u32, Ordering::SeqCst);
        Ok(())
    }
}

fn test_pool(dir: &tempfile::TempDir) -> DbPool {
    let path = dir.path().join("test.sqlite");
    create_pool(path.to_str().expect("utf-8 path")).expect("create pool")
}

mod drain_tests {
    use super::*;

    #[tokio::test]
    async fn test_processed_rows_are_never_redelivered() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir);
        let client = Arc::new(RecordingSheets::new());

        {
            let conn = get_connection(&pool).expect("conn");
            outbox::enqueue(&conn, config::sheet::INTERVIEWS, &json!({"candidate": "Иванов"})).expect("enqueue");
            outbox::enqueue(&conn, config::sheet::INTERVIEWS, &json!({"candidate": "Петров"})).expect("enqueue");
            outbox::enqueue(&conn, config::sheet::CLIMATE, &json!({"answers": {}})).expect("enqueue");
        }

        let report = drain_once(&pool, client.as_ref()).await.expect("drain");
        assert_eq!(report.processed, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(client.rows_appended.load(Ordering::SeqCst), 3);

        // A second pass finds nothing: delivery is at-most-once per row.
        let report = drain_once(&pool, client.as_ref()).await.expect("drain");
        assert_eq!(report.processed, 0);
        assert_eq!(client.rows_appended.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rows_survive_restart_until_delivered() {
        let dir = tempfile::tempdir().expect("tempdir");

        {
            let pool = test_pool(&dir);
            let conn = get_connection(&pool).expect("conn");
            outbox::enqueue(&conn, config::sheet::ONBOARDING, &json!({"rating": 5})).expect("enqueue");
        }

        // New pool over the same file simulates a process restart.
        let pool = test_pool(&dir);
        let client = Arc::new(RecordingSheets::new());
        let report = drain_once(&pool, client.as_ref()).await.expect("drain");
        assert_eq!(report.processed, 1);
    }

    #[tokio::test]
    async fn test_batch_is_grouped_by_sheet() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir);
        let client = Arc::new(RecordingSheets::new());

        {
            let conn = get_connection(&pool).expect("conn");
            for i in 0..4 {
                outbox::enqueue(&conn, config::sheet::INTERVIEWS, &json!({"n": i})).expect("enqueue");
            }
            outbox::enqueue(&conn, config::sheet::NOSHOW, &json!({"reason": "проспал"})).expect("enqueue");
        }

        drain_once(&pool, client.as_ref()).await.expect("drain");
        // One gateway call per sheet, not per row.
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
        assert_eq!(client.rows_appended.load(Ordering::SeqCst), 5);
    }
}

mod parking_tests {
    use super::*;

    #[tokio::test]
    async fn test_row_parks_after_attempt_cap_with_single_alert() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir);
        let client = Arc::new(RecordingSheets::failing());

        {
            let conn = get_connection(&pool).expect("conn");
            outbox::enqueue(&conn, config::sheet::EXIT_INTERVIEWS, &json!({"answers": {}})).expect("enqueue");
        }

        // One attempt increment per pass; the cap is reported exactly once.
        let mut parked_reports = 0;
        for _ in 0..config::queue::MAX_WRITE_ATTEMPTS {
            let report = drain_once(&pool, client.as_ref()).await.expect("drain");
            assert_eq!(report.failed, 1);
            parked_reports += report.parked.len();
        }
        assert_eq!(parked_reports, 1);

        // The parked row is excluded from later batches and stays in the table.
        let report = drain_once(&pool, client.as_ref()).await.expect("drain");
        assert_eq!(report.failed, 0);
        assert!(report.parked.is_empty());

        let conn = get_connection(&pool).expect("conn");
        assert_eq!(
            outbox::parked_count(&conn, config::queue::MAX_WRITE_ATTEMPTS).expect("count"),
            1
        );
        assert_eq!(
            outbox::pending_count(&conn, config::queue::MAX_WRITE_ATTEMPTS).expect("count"),
            0
        );
    }

    #[tokio::test]
    async fn test_recovered_gateway_delivers_rows_below_cap() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir);
        let client = Arc::new(RecordingSheets::failing());

        {
            let conn = get_connection(&pool).expect("conn");
            outbox::enqueue(&conn, config::sheet::CANDIDATE_FEEDBACK, &json!({"rating": 4})).expect("enqueue");
        }

        let report = drain_once(&pool, client.as_ref()).await.expect("drain");
        assert_eq!(report.failed, 1);

        // Gateway comes back before the cap is reached.
        client.failing.store(false, Ordering::SeqCst);
        let report = drain_once(&pool, client.as_ref()).await.expect("drain");
        assert_eq!(report.processed, 1);
        assert_eq!(client.rows_appended.load(Ordering::SeqCst), 1);
    }
}
