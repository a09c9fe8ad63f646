//! Background drain loop for the spreadsheet outbox.
//!
//! Every tick: read one batch of unprocessed rows, group them by sheet,
//! append each group through the retry engine. Success marks the rows
//! processed; failure bumps their attempt counters. Rows that hit the cap
//! are parked and reported to admins exactly once.

use std::collections::BTreeMap;
use std::sync::Arc;
use teloxide::Bot;

use crate::core::config;
use crate::core::error::AppResult;
use crate::core::retry::{retry, RetryConfig};
use crate::sheets::client::SheetsClient;
use crate::storage::{get_connection, outbox, DbPool};
use crate::telegram::notifications;

/// Outcome of a single drain pass.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Rows successfully delivered and marked processed
    pub processed: usize,
    /// Rows whose attempt counter was bumped
    pub failed: usize,
    /// Rows that hit the attempt cap on this pass, grouped by sheet
    pub parked: Vec<(String, i64)>,
}

/// Runs one drain pass over the outbox.
pub async fn drain_once(db: &DbPool, client: &dyn SheetsClient) -> AppResult<DrainReport> {
    let batch = {
        let conn = get_connection(db)?;
        outbox::fetch_batch(&conn, config::queue::BATCH_LIMIT, config::queue::MAX_WRITE_ATTEMPTS)?
    };

    let mut report = DrainReport::default();
    if batch.is_empty() {
        return Ok(report);
    }

    let mut by_sheet: BTreeMap<String, Vec<outbox::QueueItem>> = BTreeMap::new();
    for item in batch {
        by_sheet.entry(item.sheet_name.clone()).or_default().push(item);
    }

    let retry_config = RetryConfig::quick();

    for (sheet_name, items) in by_sheet {
        let rows: Vec<serde_json::Value> = items
            .iter()
            .map(|item| serde_json::from_str(&item.data_json).unwrap_or(serde_json::Value::Null))
            .collect();
        let ids: Vec<i64> = items.iter().map(|item| item.id).collect();

        let outcome = retry(&retry_config, || client.append_rows(&sheet_name, &rows)).await;

        let conn = get_connection(db)?;
        if outcome.is_ok() {
            outbox::mark_processed(&conn, &ids)?;
            report.processed += ids.len();
            log::info!("Sheets: appended {} row(s) to '{}'", ids.len(), sheet_name);
        } else {
            let newly_parked = outbox::increment_attempts(&conn, &ids, config::queue::MAX_WRITE_ATTEMPTS)?;
            report.failed += ids.len();
            log::warn!(
                "Sheets: failed to append {} row(s) to '{}' after {} attempt(s)",
                ids.len(),
                sheet_name,
                outcome.attempts
            );
            for id in newly_parked {
                report.parked.push((sheet_name.clone(), id));
            }
        }
    }

    Ok(report)
}

/// The writer task: drains the outbox on an interval and escalates parked
/// rows to administrators.
pub async fn run_queue_writer(db: Arc<DbPool>, client: Arc<dyn SheetsClient>, bot: Bot) {
    let mut ticker = tokio::time::interval(config::queue::batch_interval());

    loop {
        ticker.tick().await;
        match drain_once(&db, client.as_ref()).await {
            Ok(report) => {
                if !report.parked.is_empty() {
                    notifications::alert_parked_rows(&bot, &report.parked).await;
                }
            }
            Err(e) => log::error!("Outbox drain pass failed: {}", e),
        }
    }
}

/// One last drain before the process exits, so a clean shutdown does not
/// strand rows that a healthy gateway would accept.
pub async fn final_drain(db: &DbPool, client: &dyn SheetsClient) {
    match drain_once(db, client).await {
        Ok(report) if report.processed > 0 => {
            log::info!("Final drain delivered {} row(s)", report.processed);
        }
        Ok(_) => {}
        Err(e) => log::warn!("Final drain failed: {}", e),
    }
}
