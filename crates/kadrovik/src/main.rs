use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tokio::time::sleep;

use kadrovik::core::{config, init_logger, monitoring};
use kadrovik::sheets::{writer, HttpSheetsClient, SheetsClient};
use kadrovik::storage::create_pool;
use kadrovik::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

#[tokio::main]
async fn main() -> Result<()> {
    // Catch panics from inside the dispatcher so they end up in the log.
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    let _ = dotenv();
    init_logger(&config::LOG_FILE_PATH)?;

    monitoring::write_pid_file().map_err(|e| anyhow::anyhow!("Refusing to start: {}", e))?;

    log::info!("Starting kadrovik...");

    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH).map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );

    let bot = create_bot()?;

    // Bot API may still be coming up when we are restarted by the supervisor.
    let bot_info = {
        let max_retries = 12;
        let mut attempt = 0;
        loop {
            match bot.get_me().await {
                Ok(info) => break info,
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        return Err(anyhow::anyhow!("Failed to connect to Bot API after {} retries: {}", attempt, e));
                    }
                    log::warn!("Bot API not ready (attempt {}/{}): {}. Retrying in 5s...", attempt, max_retries, e);
                    sleep(Duration::from_secs(5)).await;
                }
            }
        }
    };
    log::info!("Bot username: {:?}, Bot ID: {}", bot_info.username, bot_info.id);

    setup_bot_commands(&bot).await?;

    tokio::spawn(monitoring::heartbeat_task());

    let ping_port = *config::ping::PORT;
    tokio::spawn(async move {
        if let Err(e) = monitoring::start_ping_server(ping_port).await {
            log::error!("Liveness server error: {}", e);
        }
    });

    // The outbox writer only runs when a spreadsheet gateway is configured;
    // rows still accumulate in the database either way.
    let sheets_client: Option<Arc<dyn SheetsClient>> = match HttpSheetsClient::from_env() {
        Ok(Some(client)) => Some(Arc::new(client)),
        Ok(None) => {
            log::warn!("SHEETS_API_URL not set, outbox writer disabled");
            None
        }
        Err(e) => {
            log::error!("Failed to build sheets client: {}", e);
            None
        }
    };
    if let Some(client) = sheets_client.clone() {
        tokio::spawn(writer::run_queue_writer(Arc::clone(&db_pool), client, bot.clone()));
    }

    let handler_deps = HandlerDeps::new(Arc::clone(&db_pool));
    let handler = schema(handler_deps);

    log::info!("Starting dispatcher in long polling mode");
    Dispatcher::builder(bot.clone(), handler)
        .dependencies(DependencyMap::new())
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher stopped, shutting down");
    if let Some(client) = sheets_client {
        writer::final_drain(&db_pool, client.as_ref()).await;
    }
    monitoring::cleanup_marker_files();

    Ok(())
}
