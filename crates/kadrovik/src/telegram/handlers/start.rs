//! /start, /cancel and /feedback commands.
//!
//! /start routes by who is asking: deep links open surveys, admins get the
//! panel, managers their menu, everyone else a welcome message. Deep link
//! payloads are `interview_<restaurant_code>` from the vacancy QR codes and
//! `exit` from the off-boarding checklist.

use teloxide::prelude::*;

use crate::core::config;
use crate::core::error::AppResult;
use crate::storage::{employees, get_connection, managers};
use crate::telegram::handlers::types::{send_text, HandlerDeps};
use crate::telegram::handlers::{admin, manager, survey_flow};
use crate::telegram::state::{DialogState, SurveyKind};

pub async fn handle_start(bot: &Bot, deps: &HandlerDeps, msg: &Message, payload: &str) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let payload = payload.trim();

    if let Some(code) = payload.strip_prefix("interview_") {
        if config::RESTAURANTS.iter().any(|(c, _)| c == code) {
            return survey_flow::start_survey(bot, deps, chat_id, SurveyKind::Recruitment, Some(code.to_string()))
                .await;
        }
        log::warn!("Unknown restaurant code '{}' in deep link from {}", code, chat_id.0);
    }

    if payload == "exit" {
        let code = {
            let conn = get_connection(&deps.db_pool)?;
            employees::restaurant_for_user(&conn, chat_id.0)?
        };
        return survey_flow::start_survey(bot, deps, chat_id, SurveyKind::ExitInterview, code).await;
    }

    if config::admin::is_admin(chat_id.0) {
        return admin::admin_panel(bot, deps, chat_id).await;
    }

    let is_manager = {
        let conn = get_connection(&deps.db_pool)?;
        managers::is_manager(&conn, chat_id.0)?
    };
    if is_manager {
        return manager::show_manager_menu(bot, deps, chat_id).await;
    }

    send_text(
        bot,
        deps,
        chat_id,
        "Привет! Я HR-бот сети ресторанов. 🍜\n\n\
         Если вы пришли по ссылке с вакансии, откройте её ещё раз, чтобы начать анкету.\n\
         Менеджеры ресторанов могут зарегистрироваться командой /register_manager.",
    )
    .await?;
    Ok(())
}

pub async fn handle_cancel(bot: &Bot, deps: &HandlerDeps, msg: &Message) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let had_dialog = deps.dialogs.load(chat_id.0)?.is_some();
    deps.dialogs.clear(chat_id.0)?;

    let text = if had_dialog {
        "Анкета прервана. Вернуться можно в любой момент через /start."
    } else {
        "Сейчас нечего отменять."
    };
    send_text(bot, deps, chat_id, text).await?;
    Ok(())
}

pub async fn handle_feedback(bot: &Bot, deps: &HandlerDeps, msg: &Message) -> AppResult<()> {
    let chat_id = msg.chat.id;
    send_text(bot, deps, chat_id, "Напишите ваш отзыв о боте одним сообщением.").await?;
    deps.dialogs.save(chat_id.0, &DialogState::BotFeedback)?;
    Ok(())
}
