//! Logger setup: terminal plus a log file.

use std::fs::OpenOptions;

use anyhow::{Context, Result};
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};

/// Initializes the global logger. The file is opened in append mode so a
/// restart keeps the previous run's tail.
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("Failed to open log file {log_file_path}"))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .context("Logger already initialized")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.log");
        std::fs::write(&path, "earlier run\n").unwrap();

        // The global logger may already be claimed by another test binary,
        // but the file must survive either way.
        let _ = init_logger(path.to_str().unwrap());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("earlier run"));
    }
}
