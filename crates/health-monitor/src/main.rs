//! Supervisor for the bot process.
//!
//! Spawns the bot as a child and keeps it alive:
//! - restarts it when the process exits for any reason
//! - restarts it when it looks frozen: the heartbeat file has gone stale
//!   AND the /ping endpoint stops answering
//! - performs a planned restart once the process has run long enough
//!
//! The heartbeat file and the ping endpoint are two independent signals on
//! purpose. A stale file alone can be clock skew or a slow disk; only when
//! both signals fail is the event loop considered hung.

use std::process::Stdio;
use std::time::{Duration, SystemTime};

use tokio::process::{Child, Command};
use tokio::signal;
use tokio::time::interval;

struct Config {
    bot_command: Vec<String>,
    heartbeat_file: String,
    ping_url: String,
    check_interval: Duration,
    frozen_threshold: Duration,
    restart_delay: Duration,
    planned_restart: Duration,
}

impl Config {
    fn from_env() -> Self {
        let bot_command = std::env::var("BOT_COMMAND")
            .unwrap_or_else(|_| "./kadrovik".to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Self {
            bot_command,
            heartbeat_file: std::env::var("HEARTBEAT_FILE").unwrap_or_else(|_| "heartbeat.txt".to_string()),
            ping_url: std::env::var("PING_URL").unwrap_or_else(|_| "http://127.0.0.1:8888/ping".to_string()),
            check_interval: env_duration("CHECK_INTERVAL_SECS", 60),
            frozen_threshold: env_duration("FROZEN_THRESHOLD_SECS", 90),
            restart_delay: env_duration("RESTART_DELAY_SECS", 5),
            planned_restart: env_duration("PLANNED_RESTART_SECS", 7 * 24 * 60 * 60),
        }
    }
}

fn env_duration(name: &str, default_secs: u64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();
    let config = Config::from_env();

    if config.bot_command.is_empty() {
        log::error!("BOT_COMMAND is empty, nothing to supervise");
        std::process::exit(1);
    }

    log::info!(
        "Supervising {:?} (check every {:?}, frozen threshold {:?})",
        config.bot_command,
        config.check_interval,
        config.frozen_threshold
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    tokio::select! {
        _ = supervise(&config, &http) => {}
        _ = signal::ctrl_c() => {
            log::info!("Received Ctrl-C, shutting down supervisor");
        }
    }
}

async fn supervise(config: &Config, http: &reqwest::Client) {
    loop {
        // A stale heartbeat from the previous run must not trigger an
        // immediate frozen verdict.
        remove_marker(&config.heartbeat_file);

        let mut child = match spawn_bot(config) {
            Ok(child) => child,
            Err(e) => {
                log::error!("Failed to spawn bot: {}. Retrying in {:?}", e, config.restart_delay);
                tokio::time::sleep(config.restart_delay).await;
                continue;
            }
        };

        let started = SystemTime::now();
        log::info!("Bot started (pid {:?})", child.id());

        let reason = watch_child(config, http, &mut child, started).await;
        log::warn!("Restarting bot: {}", reason);

        tokio::time::sleep(config.restart_delay).await;
    }
}

fn spawn_bot(config: &Config) -> std::io::Result<Child> {
    let mut cmd = Command::new(&config.bot_command[0]);
    cmd.args(&config.bot_command[1..])
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    cmd.spawn()
}

/// Watches one bot incarnation until it needs a restart. Returns the reason.
async fn watch_child(config: &Config, http: &reqwest::Client, child: &mut Child, started: SystemTime) -> String {
    let mut ticker = interval(config.check_interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            status = child.wait() => {
                return match status {
                    Ok(s) => format!("process exited with {}", s),
                    Err(e) => format!("wait() failed: {}", e),
                };
            }
            _ = ticker.tick() => {}
        }

        let uptime = started.elapsed().unwrap_or_default();
        if uptime >= config.planned_restart {
            kill_child(child).await;
            return format!("planned restart after {:?} of uptime", uptime);
        }

        let heartbeat_age = heartbeat_age(&config.heartbeat_file);
        if heartbeat_age.map(|age| age > config.frozen_threshold).unwrap_or(true) {
            log::warn!(
                "Heartbeat is stale (age: {:?}), probing {}",
                heartbeat_age,
                config.ping_url
            );
            if !ping_ok(http, &config.ping_url).await {
                kill_child(child).await;
                return "heartbeat stale and /ping unreachable".to_string();
            }
            log::info!("/ping still answers, treating stale heartbeat as transient");
        }
    }
}

fn heartbeat_age(path: &str) -> Option<Duration> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    modified.elapsed().ok()
}

async fn ping_ok(http: &reqwest::Client, url: &str) -> bool {
    match http.get(url).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            log::warn!("Ping request failed: {}", e);
            false
        }
    }
}

async fn kill_child(child: &mut Child) {
    if let Err(e) = child.kill().await {
        log::error!("Failed to kill bot process: {}", e);
    }
    let _ = child.wait().await;
}

fn remove_marker(path: &str) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove {}: {}", path, e);
        }
    }
}
