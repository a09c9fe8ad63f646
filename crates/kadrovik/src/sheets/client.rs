//! Spreadsheet gateway client.
//!
//! The writer talks to a single authenticated append endpoint; the trait
//! seam keeps the drain loop testable without a network.

use async_trait::async_trait;
use serde_json::json;

use crate::core::config;
use crate::core::error::{AppError, AppResult};

#[async_trait]
pub trait SheetsClient: Send + Sync {
    /// Appends `rows` to the named sheet. All-or-nothing per call.
    async fn append_rows(&self, sheet_name: &str, rows: &[serde_json::Value]) -> AppResult<()>;
}

/// HTTP implementation POSTing JSON batches to the configured gateway.
pub struct HttpSheetsClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpSheetsClient {
    pub fn new(base_url: &str, token: &str) -> AppResult<Self> {
        let client = reqwest::Client::builder().timeout(config::network::timeout()).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Builds a client from SHEETS_API_URL / SHEETS_API_TOKEN.
    /// Returns None when no gateway is configured.
    pub fn from_env() -> AppResult<Option<Self>> {
        if config::SHEETS_API_URL.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::new(&config::SHEETS_API_URL, &config::SHEETS_API_TOKEN)?))
    }
}

#[async_trait]
impl SheetsClient for HttpSheetsClient {
    async fn append_rows(&self, sheet_name: &str, rows: &[serde_json::Value]) -> AppResult<()> {
        let url = format!("{}/append", self.base_url);
        let body = json!({
            "sheet": sheet_name,
            "rows": rows,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus(status));
        }

        Ok(())
    }
}
