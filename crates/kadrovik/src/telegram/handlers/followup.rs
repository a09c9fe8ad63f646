//! Scheduled follow-ups: candidate feedback ask and the no-show check.
//!
//! Jobs are in-process timers. They are intentionally not persisted: both
//! are best-effort nudges, and a restart in the window only skips a nudge,
//! never loses durable state.

use chrono::{Local, NaiveDate, NaiveTime};
use serde_json::json;
use teloxide::prelude::*;

use crate::core::config;
use crate::core::error::AppResult;
use crate::storage::{get_connection, outbox, surveys as survey_store};
use crate::telegram::handlers::survey_flow;
use crate::telegram::handlers::types::{send_text, send_with_keyboard, HandlerDeps};
use crate::telegram::handlers::decision;
use crate::telegram::keyboards;
use crate::telegram::state::{DialogState, SurveyKind};

/// Asks the candidate to rate the interview half an hour after it ends.
pub fn schedule_candidate_feedback(bot: Bot, deps: HandlerDeps, chat_id: ChatId) {
    tokio::spawn(async move {
        tokio::time::sleep(config::followup::candidate_feedback_delay()).await;

        // Skip when the user is mid-dialog or already rated the bot.
        let busy = matches!(deps.dialogs.load(chat_id.0), Ok(Some(_)));
        let rated = {
            let kind = SurveyKind::CandidateFeedback.to_string();
            match get_connection(&deps.db_pool) {
                Ok(conn) => survey_store::survey_completed_at(&conn, &kind, chat_id.0)
                    .ok()
                    .flatten()
                    .is_some(),
                Err(_) => true,
            }
        };
        if busy || rated {
            return;
        }

        if let Err(e) = survey_flow::start_survey(&bot, &deps, chat_id, SurveyKind::CandidateFeedback, None).await {
            log::warn!("Could not start candidate feedback survey for {}: {}", chat_id.0, e);
        }
    });
}

/// Asks the candidate whether the first shift happened, the day after it.
pub fn schedule_noshow_check(bot: Bot, deps: HandlerDeps, chat_id: ChatId, restaurant_code: String, shift_date: String) {
    let delay = noshow_delay(&shift_date);

    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        let question = "Привет! Вчера у вас должна была быть первая смена. Всё получилось?";
        if let Err(e) = send_with_keyboard(
            &bot,
            &deps,
            chat_id,
            question,
            keyboards::noshow_keyboard(&restaurant_code),
        )
        .await
        {
            log::warn!("Could not send no-show check to {}: {}", chat_id.0, e);
        }
    });
}

/// Noon the day after the shift; falls back to a fixed delay when the date
/// does not parse or is already in the past.
fn noshow_delay(shift_date: &str) -> std::time::Duration {
    let Ok(date) = NaiveDate::parse_from_str(shift_date, "%d.%m.%Y") else {
        return config::followup::noshow_fallback_delay();
    };
    let Some(check_at) = date
        .succ_opt()
        .and_then(|d| NaiveTime::from_hms_opt(12, 0, 0).map(|t| d.and_time(t)))
    else {
        return config::followup::noshow_fallback_delay();
    };

    let now = Local::now().naive_local();
    match (check_at - now).to_std() {
        Ok(delay) => delay,
        Err(_) => config::followup::noshow_fallback_delay(),
    }
}

/// Handles `onb:yes:<code>`: the shift happened; activate and start onboarding.
pub async fn handle_shift_confirmed(
    bot: &Bot,
    deps: &HandlerDeps,
    query: &CallbackQuery,
    restaurant_code: &str,
) -> AppResult<()> {
    bot.answer_callback_query(query.id.clone()).await?;
    let Some(message) = query.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let _ = bot.edit_message_reply_markup(chat_id, message.id()).await;

    decision::activate_candidate(deps, chat_id.0)?;
    survey_flow::start_survey(bot, deps, chat_id, SurveyKind::Onboarding, Some(restaurant_code.to_string())).await
}

/// Handles `onb:no:<code>`: no-show, ask for the reason.
pub async fn handle_shift_missed(
    bot: &Bot,
    deps: &HandlerDeps,
    query: &CallbackQuery,
    restaurant_code: &str,
) -> AppResult<()> {
    bot.answer_callback_query(query.id.clone()).await?;
    let Some(message) = query.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let _ = bot.edit_message_reply_markup(chat_id, message.id()).await;

    send_text(bot, deps, chat_id, "Жаль! Расскажите, что помешало выйти?").await?;
    deps.dialogs.save(
        chat_id.0,
        &DialogState::NoShowReason {
            restaurant_code: restaurant_code.to_string(),
        },
    )?;
    Ok(())
}

/// The typed no-show reason: record it and warn the restaurant's managers.
pub async fn handle_noshow_reason_message(
    bot: &Bot,
    deps: &HandlerDeps,
    msg: &Message,
    restaurant_code: &str,
) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let reason = msg.text().unwrap_or_default().trim().to_string();

    let managers = {
        let conn = get_connection(&deps.db_pool)?;
        let row = json!({
            "submitted_at": chrono::Utc::now().to_rfc3339(),
            "user_id": chat_id.0,
            "restaurant": config::restaurant_name(restaurant_code),
            "reason": reason,
        });
        outbox::enqueue(&conn, config::sheet::NOSHOW, &row)?;
        crate::storage::managers::managers_for_restaurant(&conn, restaurant_code)?
    };
    deps.dialogs.clear(chat_id.0)?;

    send_text(bot, deps, chat_id, "Спасибо, что предупредили. Если передумаете — напишите нам!").await?;

    let alert = format!(
        "🚶 Невыход на стажировку — {}\nКандидат: {}\nПричина: {}",
        config::restaurant_name(restaurant_code),
        chat_id.0,
        reason
    );
    for m in managers {
        let _ = bot.send_message(ChatId(m.user_id), &alert).await;
    }
    Ok(())
}
