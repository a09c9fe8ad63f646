//! Admin alerts and send helpers.
//!
//! Alert sends are log-and-continue: a dead admin chat must never abort the
//! flow that triggered the alert.

use teloxide::prelude::*;
use teloxide::types::ChatId;
use teloxide::ApiError;
use teloxide::RequestError;

use crate::core::config;

/// Sends a plain-text message to every configured administrator.
pub async fn notify_admins(bot: &Bot, text: &str) {
    if config::admin::ADMIN_IDS.is_empty() {
        log::warn!("No admins configured, dropping notification: {}", text);
        return;
    }

    for admin_id in config::admin::ADMIN_IDS.iter() {
        if let Err(e) = bot.send_message(ChatId(*admin_id), text).await {
            log::error!("Failed to notify admin {}: {}", admin_id, e);
        }
    }
}

/// Escalation for outbox rows that hit the write attempt cap.
///
/// Called with rows that were parked on this drain pass only, so each row
/// is reported exactly once.
pub async fn alert_parked_rows(bot: &Bot, parked: &[(String, i64)]) {
    let mut lines = vec![format!(
        "⚠️ Выгрузка в таблицы: {} строк(и) не записались после {} попыток и отложены.",
        parked.len(),
        config::queue::MAX_WRITE_ATTEMPTS
    )];
    for (sheet, id) in parked {
        lines.push(format!("• «{sheet}», строка очереди #{id}"));
    }
    lines.push("Проверьте доступность таблицы и ключ API.".to_string());

    notify_admins(bot, &lines.join("\n")).await;
}

/// True when the user has blocked the bot or deleted their account.
/// The caller is expected to clean up the user's state.
pub fn is_blocked_error(err: &RequestError) -> bool {
    matches!(
        err,
        RequestError::Api(ApiError::BotBlocked) | RequestError::Api(ApiError::UserDeactivated)
    )
}
