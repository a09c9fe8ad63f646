use thiserror::Error;

/// The one error type everything below `main` returns.
///
/// `thiserror` derives the `From` impls, so `?` converts library errors
/// at the call site.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx reply from the sheets gateway
    #[error("HTTP request failed with status: {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),

    /// Bad input or bad configuration; never retried
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type AppResult<T> = Result<T, AppError>;
