//! Handler types, dependencies, and send helpers

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, Message};

use crate::core::error::AppResult;
use crate::storage::db::DbPool;
use crate::storage::{feedback, get_connection};
use crate::telegram::notifications::is_blocked_error;
use crate::telegram::state::DialogStore;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub dialogs: DialogStore,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        let dialogs = DialogStore::new(Arc::clone(&db_pool));
        Self { db_pool, dialogs }
    }
}

/// Drops everything stored about a user who blocked the bot.
pub fn cleanup_blocked_user(deps: &HandlerDeps, user_id: i64) {
    log::info!("User {} blocked the bot, removing their data", user_id);
    match get_connection(&deps.db_pool) {
        Ok(conn) => {
            if let Err(e) = feedback::delete_user_data(&conn, user_id) {
                log::error!("Failed to delete data for blocked user {}: {}", user_id, e);
            }
        }
        Err(e) => log::error!("No DB connection while cleaning up user {}: {}", user_id, e),
    }
}

/// Sends a text message, silently cleaning up state when the user has
/// blocked the bot. Returns None in that case.
pub async fn send_text(bot: &Bot, deps: &HandlerDeps, chat_id: ChatId, text: &str) -> AppResult<Option<Message>> {
    match bot.send_message(chat_id, text).await {
        Ok(message) => Ok(Some(message)),
        Err(e) if is_blocked_error(&e) => {
            cleanup_blocked_user(deps, chat_id.0);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Same as [`send_text`] with an inline keyboard attached.
pub async fn send_with_keyboard(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    text: &str,
    keyboard: InlineKeyboardMarkup,
) -> AppResult<Option<Message>> {
    match bot.send_message(chat_id, text).reply_markup(keyboard).await {
        Ok(message) => Ok(Some(message)),
        Err(e) if is_blocked_error(&e) => {
            cleanup_blocked_user(deps, chat_id.0);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
