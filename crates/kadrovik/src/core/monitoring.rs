//! Liveness signals consumed by the external supervisor.
//!
//! Three signals, checked together by health-monitor:
//! - PID file written at startup (also guards against double starts)
//! - heartbeat file refreshed by a background task
//! - HTTP `GET /ping` on a local port, which also touches a marker file

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::config;
use crate::core::error::{AppError, AppResult};

/// Writes the current PID to the PID file.
///
/// Refuses to start when the file points at a process that is still alive,
/// so a second instance cannot race the first one for the database.
pub fn write_pid_file() -> AppResult<()> {
    let path = config::PID_FILE.as_str();

    if let Ok(raw) = std::fs::read_to_string(path) {
        if let Ok(old_pid) = raw.trim().parse::<u32>() {
            if process_alive(old_pid) {
                return Err(AppError::Validation(format!(
                    "another instance is already running (pid {old_pid})"
                )));
            }
            log::warn!("Removing stale PID file (pid {} is gone)", old_pid);
        }
    }

    std::fs::write(path, std::process::id().to_string())?;
    Ok(())
}

/// Removes PID, heartbeat, and ping marker files on shutdown.
pub fn cleanup_marker_files() {
    for path in [
        config::PID_FILE.as_str(),
        config::HEARTBEAT_FILE.as_str(),
        config::PING_FILE.as_str(),
    ] {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove {}: {}", path, e);
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    // Without procfs we cannot tell; assume the old instance is gone.
    false
}

/// Background task refreshing the heartbeat file.
///
/// The supervisor treats a heartbeat older than its frozen threshold as a
/// hung event loop, so this must run on the same runtime as the dispatcher.
pub async fn heartbeat_task() {
    let mut ticker = tokio::time::interval(config::heartbeat::interval());

    loop {
        ticker.tick().await;
        let stamp = chrono::Utc::now().to_rfc3339();
        if let Err(e) = tokio::fs::write(config::HEARTBEAT_FILE.as_str(), &stamp).await {
            log::error!("Failed to write heartbeat file: {}", e);
        }
    }
}

/// Starts the local liveness HTTP server.
pub async fn start_ping_server(port: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let app = Router::new()
        .route("/ping", get(ping_handler))
        .route("/health", get(ping_handler));

    log::info!("Starting liveness server on http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// GET /ping answers 200 and touches the ping marker file.
async fn ping_handler() -> impl IntoResponse {
    let stamp = chrono::Utc::now().to_rfc3339();
    if let Err(e) = tokio::fs::write(config::PING_FILE.as_str(), &stamp).await {
        log::warn!("Failed to write ping marker file: {}", e);
    }
    (StatusCode::OK, "ok")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn test_own_process_is_alive() {
        assert!(process_alive(std::process::id()));
    }

    #[test]
    fn test_dead_pid_is_not_alive() {
        // PID 4194305 is above the default Linux pid_max.
        assert!(!process_alive(4_194_305));
    }
}
