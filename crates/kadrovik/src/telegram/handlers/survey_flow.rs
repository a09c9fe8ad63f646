//! Generic survey flow: sending steps, recording answers, completion.
//!
//! The flow is the same for every survey type; completion fans out by kind.

use chrono::Utc;
use serde_json::json;
use teloxide::prelude::*;
use uuid::Uuid;

use crate::core::config;
use crate::core::error::AppResult;
use crate::storage::{employees, feedback, get_connection, outbox, surveys as survey_store};
use crate::telegram::handlers::followup;
use crate::telegram::handlers::types::{send_text, send_with_keyboard, HandlerDeps};
use crate::telegram::keyboards;
use crate::telegram::notifications::notify_admins;
use crate::telegram::state::{DialogState, SurveyDialog, SurveyKind};
use crate::telegram::surveys::{self, StepInput, StepOutcome, SurveyDef};

/// Starts a survey for the chat, replacing whatever dialog was there.
pub async fn start_survey(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    kind: SurveyKind,
    restaurant_code: Option<String>,
) -> AppResult<()> {
    // Exit interviews are on a per-user cooldown.
    if kind == SurveyKind::ExitInterview {
        let conn = get_connection(&deps.db_pool)?;
        if let Some(completed) = survey_store::survey_completed_at(&conn, &kind.to_string(), chat_id.0)? {
            let age = Utc::now() - completed;
            if age.num_days() < config::followup::EXIT_COOLDOWN_DAYS {
                send_text(bot, deps, chat_id, "Вы уже проходили выходное интервью недавно. Спасибо!").await?;
                return Ok(());
            }
        }
    }

    let def = surveys::survey_def(kind);
    let dialog = SurveyDialog::new(kind, restaurant_code);

    send_text(bot, deps, chat_id, &format!("{}\n\nОтветьте на несколько вопросов.", def.title)).await?;
    send_current_step(bot, deps, chat_id, def, &dialog).await?;
    deps.dialogs.save(chat_id.0, &DialogState::Survey(dialog))?;
    Ok(())
}

/// Sends the prompt (and keyboard, if any) for the dialog's current step.
pub async fn send_current_step(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    def: &SurveyDef,
    dialog: &SurveyDialog,
) -> AppResult<()> {
    let Some(step) = def.step(dialog.step) else {
        return Ok(());
    };

    let text = format!(
        "{}\n\n{}",
        surveys::progress_bar(dialog.step, def.steps.len()),
        step.prompt
    );

    match step.input {
        StepInput::Text(_) => {
            send_text(bot, deps, chat_id, &text).await?;
        }
        StepInput::Choice(options) => {
            send_with_keyboard(bot, deps, chat_id, &text, keyboards::choice_keyboard(options)).await?;
        }
        StepInput::MultiChoice(options) => {
            send_with_keyboard(
                bot,
                deps,
                chat_id,
                &text,
                keyboards::multi_choice_keyboard(options, &dialog.selected),
            )
            .await?;
        }
    }
    Ok(())
}

/// Routes a typed message into the survey in progress.
pub async fn handle_survey_message(
    bot: &Bot,
    deps: &HandlerDeps,
    msg: &Message,
    mut dialog: SurveyDialog,
) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let def = surveys::survey_def(dialog.kind);
    let text = msg.text().unwrap_or_default();

    match surveys::answer_text(def, &mut dialog, text) {
        StepOutcome::Reprompt(reason) => {
            send_text(bot, deps, chat_id, &reason).await?;
            deps.dialogs.save(chat_id.0, &DialogState::Survey(dialog))?;
        }
        StepOutcome::Advance => {
            send_current_step(bot, deps, chat_id, def, &dialog).await?;
            deps.dialogs.save(chat_id.0, &DialogState::Survey(dialog))?;
        }
        StepOutcome::Complete => {
            finalize_survey(bot, deps, msg.chat.id, msg.from.as_ref(), dialog).await?;
        }
    }
    Ok(())
}

/// Routes a survey keyboard press (`ans:<idx>`, `mch:<idx>`, `mch:done`).
pub async fn handle_survey_callback(
    bot: &Bot,
    deps: &HandlerDeps,
    query: &CallbackQuery,
    mut dialog: SurveyDialog,
    data: &str,
) -> AppResult<()> {
    let Some(message) = query.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let def = surveys::survey_def(dialog.kind);

    let outcome = if let Some(index) = data.strip_prefix("ans:").and_then(|s| s.parse::<usize>().ok()) {
        surveys::answer_choice(def, &mut dialog, index)
    } else if data == "mch:done" {
        surveys::finish_multi_choice(def, &mut dialog)
    } else if let Some(index) = data.strip_prefix("mch:").and_then(|s| s.parse::<usize>().ok()) {
        // Toggle an option and redraw the keyboard in place.
        if let Some(options) = surveys::toggle_multi_choice(def, &mut dialog, index) {
            let _ = bot
                .edit_message_reply_markup(chat_id, message.id())
                .reply_markup(keyboards::multi_choice_keyboard(options, &dialog.selected))
                .await;
        }
        deps.dialogs.save(chat_id.0, &DialogState::Survey(dialog))?;
        bot.answer_callback_query(query.id.clone()).await?;
        return Ok(());
    } else {
        bot.answer_callback_query(query.id.clone()).await?;
        return Ok(());
    };

    bot.answer_callback_query(query.id.clone()).await?;
    // Freeze the answered keyboard so old buttons cannot re-fire.
    let _ = bot.edit_message_reply_markup(chat_id, message.id()).await;

    match outcome {
        StepOutcome::Reprompt(reason) => {
            send_text(bot, deps, chat_id, &reason).await?;
            deps.dialogs.save(chat_id.0, &DialogState::Survey(dialog))?;
        }
        StepOutcome::Advance => {
            send_current_step(bot, deps, chat_id, def, &dialog).await?;
            deps.dialogs.save(chat_id.0, &DialogState::Survey(dialog))?;
        }
        StepOutcome::Complete => {
            finalize_survey(bot, deps, chat_id, Some(&query.from), dialog).await?;
        }
    }
    Ok(())
}

/// Completion: queue the spreadsheet row, mark completion, run per-kind
/// side effects, clear the dialog.
async fn finalize_survey(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    user: Option<&teloxide::types::User>,
    dialog: SurveyDialog,
) -> AppResult<()> {
    let def = surveys::survey_def(dialog.kind);
    let restaurant = dialog.restaurant_code.clone().unwrap_or_default();

    {
        let conn = get_connection(&deps.db_pool)?;

        let mut row = json!({
            "submitted_at": Utc::now().to_rfc3339(),
            "restaurant": config::restaurant_name(&restaurant),
            "answers": serde_json::Value::Object(dialog.answers.clone()),
        });
        // Climate answers stay anonymous; every other survey carries the user.
        if dialog.kind != SurveyKind::Climate {
            row["user_id"] = json!(chat_id.0);
            if let Some(u) = user {
                row["username"] = json!(u.username.clone().unwrap_or_default());
            }
        }

        outbox::enqueue(&conn, def.sheet, &row)?;
        survey_store::mark_survey_completed(&conn, &dialog.kind.to_string(), chat_id.0)?;
    }

    deps.dialogs.clear(chat_id.0)?;

    match dialog.kind {
        SurveyKind::Recruitment => {
            finalize_recruitment(bot, deps, chat_id, &dialog).await?;
        }
        SurveyKind::Onboarding => {
            send_text(bot, deps, chat_id, "Спасибо! Ваши ответы переданы менеджеру. Хорошей работы! 🙌").await?;
        }
        SurveyKind::ExitInterview => {
            send_text(bot, deps, chat_id, "Спасибо за откровенные ответы. Они помогут нам стать лучше.").await?;
        }
        SurveyKind::Climate => {
            send_text(bot, deps, chat_id, "Спасибо! Опрос анонимный, ответы видит только HR-команда.").await?;
        }
        SurveyKind::CandidateFeedback => {
            send_text(bot, deps, chat_id, "Спасибо за оценку! 💙").await?;
        }
    }
    Ok(())
}

/// Recruitment completion: register the candidate, fan tasks out to the
/// restaurant's managers and the admins, schedule the feedback ask.
async fn finalize_recruitment(bot: &Bot, deps: &HandlerDeps, chat_id: ChatId, dialog: &SurveyDialog) -> AppResult<()> {
    let restaurant_code = dialog.restaurant_code.clone().unwrap_or_default();
    let candidate_name = dialog
        .answers
        .get("full_name")
        .and_then(|v| v.as_str())
        .unwrap_or("Без имени")
        .to_string();
    let position = dialog
        .answers
        .get("position")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let job_data = serde_json::Value::Object(dialog.answers.clone());
    let job_data_json = job_data.to_string();

    // Candidate is an inactive employee until an onboarding decision.
    let recipients = {
        let conn = get_connection(&deps.db_pool)?;
        employees::upsert_employee(&conn, chat_id.0, &restaurant_code, &candidate_name, &position, false)?;

        let mut ids: Vec<i64> = Vec::new();
        for manager in crate::storage::managers::managers_for_restaurant(&conn, &restaurant_code)? {
            ids.push(manager.user_id);
        }
        for admin_id in config::admin::ADMIN_IDS.iter() {
            if !ids.contains(admin_id) {
                ids.push(*admin_id);
            }
        }
        ids
    };

    if recipients.is_empty() {
        log::warn!(
            "No recipients for candidate {} at '{}', only admins will see the sheet row",
            chat_id.0,
            restaurant_code
        );
    }

    let summary = candidate_summary(&candidate_name, &restaurant_code, dialog);

    for recipient in recipients {
        let feedback_id = Uuid::new_v4().to_string();
        let sent = match bot
            .send_message(ChatId(recipient), &summary)
            .reply_markup(keyboards::decision_keyboard(&feedback_id))
            .await
        {
            Ok(m) => m,
            Err(e) => {
                log::error!("Failed to deliver candidate card to {}: {}", recipient, e);
                continue;
            }
        };

        let conn = get_connection(&deps.db_pool)?;
        feedback::create_pending_feedback(
            &conn,
            &feedback_id,
            recipient,
            sent.id.0 as i64,
            chat_id.0,
            &candidate_name,
            &job_data_json,
        )?;
    }

    send_text(
        bot,
        deps,
        chat_id,
        "Спасибо! Анкета передана менеджеру ресторана. Мы свяжемся с вами в ближайшее время. 🤝",
    )
    .await?;

    followup::schedule_candidate_feedback(bot.clone(), deps.clone(), chat_id);
    Ok(())
}

/// Short candidate card for the task message; the full report is behind
/// a button.
fn candidate_summary(candidate_name: &str, restaurant_code: &str, dialog: &SurveyDialog) -> String {
    let pick = |key: &str| {
        dialog
            .answers
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("—")
            .to_string()
    };

    format!(
        "🆕 Новый кандидат — {}\n\n\
         👤 {}\n\
         📍 Позиция: {}\n\
         🎂 Возраст: {}\n\
         📞 Телефон: {}\n\
         🗓 График: {}\n\
         🚀 Готов выйти: {}",
        config::restaurant_name(restaurant_code),
        candidate_name,
        pick("position"),
        pick("age"),
        pick("phone"),
        pick("schedule"),
        pick("start_date"),
    )
}

/// Renders the full questionnaire behind the "Полная анкета" button.
pub async fn handle_report_callback(bot: &Bot, deps: &HandlerDeps, query: &CallbackQuery, feedback_id: &str) -> AppResult<()> {
    bot.answer_callback_query(query.id.clone()).await?;
    let Some(message) = query.message.as_ref() else {
        return Ok(());
    };

    let task = {
        let conn = get_connection(&deps.db_pool)?;
        feedback::get_pending_feedback(&conn, feedback_id)?
    };

    let Some(task) = task else {
        send_text(bot, deps, message.chat().id, "Эта заявка уже закрыта.").await?;
        return Ok(());
    };

    let answers: serde_json::Value = serde_json::from_str(&task.job_data_json)?;
    let def = surveys::survey_def(SurveyKind::Recruitment);

    let mut lines = vec![format!("📄 Полная анкета — {}\n", task.candidate_name)];
    for step in def.steps {
        let answer = answers.get(step.key).and_then(|v| v.as_str()).unwrap_or("—");
        lines.push(format!("▪️ {}\n{}", step.prompt, answer));
    }

    send_text(bot, deps, message.chat().id, &lines.join("\n\n")).await?;
    Ok(())
}

/// Notifies admins about free-form bot feedback and queues it for the sheet.
pub async fn handle_bot_feedback_message(bot: &Bot, deps: &HandlerDeps, msg: &Message) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let text = msg.text().unwrap_or_default();

    {
        let conn = get_connection(&deps.db_pool)?;
        let row = json!({
            "submitted_at": Utc::now().to_rfc3339(),
            "user_id": chat_id.0,
            "text": text,
        });
        outbox::enqueue(&conn, config::sheet::BOT_FEEDBACK, &row)?;
    }
    deps.dialogs.clear(chat_id.0)?;

    notify_admins(bot, &format!("💬 Отзыв о боте от {}:\n\n{}", chat_id.0, text)).await;
    send_text(bot, deps, chat_id, "Спасибо за отзыв!").await?;
    Ok(())
}
