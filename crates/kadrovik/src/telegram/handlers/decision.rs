//! Manager decisions about candidates.
//!
//! Any recipient of a candidate card can decide. An invitation collects the
//! first shift date/time and an optional comment; a rejection collects a
//! reason. Every decision is final: the candidate's tasks move to history,
//! the other recipients are notified and their buttons removed.

use chrono::{NaiveDate, Utc};
use serde_json::json;
use teloxide::prelude::*;
use teloxide::types::MessageId;

use crate::core::config;
use crate::core::error::AppResult;
use crate::storage::{employees, feedback, get_connection, outbox};
use crate::telegram::handlers::followup;
use crate::telegram::handlers::types::{send_text, HandlerDeps};
use crate::telegram::state::{DecisionDialog, DecisionStage, DialogState};

/// Final statuses stored in `feedback_history` and the decisions sheet.
pub mod status {
    pub const INVITED: &str = "invited";
    pub const REFUSED: &str = "refused";
    pub const UNSUITABLE: &str = "unsuitable";
}

/// Handles `dec:<status>:<feedback_id>`: a decision button was pressed.
pub async fn handle_decision_callback(
    bot: &Bot,
    deps: &HandlerDeps,
    query: &CallbackQuery,
    decision: &str,
    feedback_id: &str,
) -> AppResult<()> {
    bot.answer_callback_query(query.id.clone()).await?;
    let Some(message) = query.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;

    let task = {
        let conn = get_connection(&deps.db_pool)?;
        feedback::get_pending_feedback(&conn, feedback_id)?
    };
    let Some(task) = task else {
        // Resolved by someone else while the card sat in this chat.
        let _ = bot.edit_message_reply_markup(chat_id, message.id()).await;
        send_text(bot, deps, chat_id, "По этому кандидату уже принято решение.").await?;
        return Ok(());
    };

    let dialog = match decision {
        "invite" => {
            send_text(
                bot,
                deps,
                chat_id,
                &format!(
                    "Приглашаем {} на стажировку.\nУкажите дату первой смены (ДД.ММ.ГГГГ).",
                    task.candidate_name
                ),
            )
            .await?;
            DecisionDialog {
                feedback_id: feedback_id.to_string(),
                candidate_id: task.candidate_id,
                candidate_name: task.candidate_name.clone(),
                stage: DecisionStage::ShiftDate,
            }
        }
        "refused" | "unsuitable" => {
            let status = if decision == "refused" {
                status::REFUSED
            } else {
                status::UNSUITABLE
            };
            send_text(bot, deps, chat_id, "Укажите причину одним сообщением.").await?;
            DecisionDialog {
                feedback_id: feedback_id.to_string(),
                candidate_id: task.candidate_id,
                candidate_name: task.candidate_name.clone(),
                stage: DecisionStage::RejectReason {
                    status: status.to_string(),
                },
            }
        }
        _ => return Ok(()),
    };

    deps.dialogs.save(chat_id.0, &DialogState::ManagerDecision(dialog))?;
    Ok(())
}

/// Text input inside a decision dialog (date, time, comment, or reason).
pub async fn handle_decision_message(
    bot: &Bot,
    deps: &HandlerDeps,
    msg: &Message,
    mut dialog: DecisionDialog,
) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let text = msg.text().unwrap_or_default().trim().to_string();

    match dialog.stage.clone() {
        DecisionStage::ShiftDate => {
            if NaiveDate::parse_from_str(&text, "%d.%m.%Y").is_err() {
                send_text(bot, deps, chat_id, "Не получилось разобрать дату. Формат: ДД.ММ.ГГГГ, например 03.09.2026.").await?;
                return Ok(());
            }
            dialog.stage = DecisionStage::ShiftTime { shift_date: text };
            send_text(bot, deps, chat_id, "Во сколько начало смены? Например, 10:00.").await?;
            deps.dialogs.save(chat_id.0, &DialogState::ManagerDecision(dialog))?;
        }
        DecisionStage::ShiftTime { shift_date } => {
            dialog.stage = DecisionStage::Comment {
                shift_date,
                shift_time: text,
            };
            send_text(
                bot,
                deps,
                chat_id,
                "Комментарий для кандидата (что взять с собой, к кому обратиться). Если не нужен, напишите «нет».",
            )
            .await?;
            deps.dialogs.save(chat_id.0, &DialogState::ManagerDecision(dialog))?;
        }
        DecisionStage::Comment { shift_date, shift_time } => {
            let comment = if text.to_lowercase() == "нет" { String::new() } else { text };
            finalize_invitation(bot, deps, chat_id, &dialog, &shift_date, &shift_time, &comment).await?;
        }
        DecisionStage::RejectReason { status } => {
            finalize_rejection(bot, deps, chat_id, &dialog, &status, &text).await?;
        }
    }
    Ok(())
}

async fn finalize_invitation(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    dialog: &DecisionDialog,
    shift_date: &str,
    shift_time: &str,
    comment: &str,
) -> AppResult<()> {
    let restaurant_code = {
        let conn = get_connection(&deps.db_pool)?;

        let row = json!({
            "submitted_at": Utc::now().to_rfc3339(),
            "candidate": dialog.candidate_name,
            "candidate_id": dialog.candidate_id,
            "decision": status::INVITED,
            "shift_date": shift_date,
            "shift_time": shift_time,
            "comment": comment,
            "decided_by": chat_id.0,
        });
        outbox::enqueue(&conn, config::sheet::MANAGER_DECISIONS, &row)?;

        let moved = feedback::move_to_history(&conn, dialog.candidate_id, chat_id.0, status::INVITED)?;
        notify_other_holders(bot, chat_id, &moved, &format!("✅ {} приглашён(а) на стажировку.", dialog.candidate_name)).await;

        // The shift restaurant comes from the candidate's employee record.
        employees::restaurant_for_user(&conn, dialog.candidate_id)?.unwrap_or_default()
    };

    deps.dialogs.clear(chat_id.0)?;
    send_text(
        bot,
        deps,
        chat_id,
        &format!("Готово. {} приглашён(а) на {} {}.", dialog.candidate_name, shift_date, shift_time),
    )
    .await?;

    // Tell the candidate about the shift.
    let mut invite = format!(
        "🎉 Хорошие новости! Вас приглашают на стажировку.\n\n🗓 {} в {}\n📍 {}",
        shift_date,
        shift_time,
        config::restaurant_name(&restaurant_code)
    );
    if !comment.is_empty() {
        invite.push_str(&format!("\n\n💬 {comment}"));
    }
    let _ = send_text(bot, deps, ChatId(dialog.candidate_id), &invite).await;

    followup::schedule_noshow_check(
        bot.clone(),
        deps.clone(),
        ChatId(dialog.candidate_id),
        restaurant_code,
        shift_date.to_string(),
    );
    Ok(())
}

async fn finalize_rejection(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    dialog: &DecisionDialog,
    status: &str,
    reason: &str,
) -> AppResult<()> {
    {
        let conn = get_connection(&deps.db_pool)?;

        let row = json!({
            "submitted_at": Utc::now().to_rfc3339(),
            "candidate": dialog.candidate_name,
            "candidate_id": dialog.candidate_id,
            "decision": status,
            "reason": reason,
            "decided_by": chat_id.0,
        });
        outbox::enqueue(&conn, config::sheet::MANAGER_DECISIONS, &row)?;

        let moved = feedback::move_to_history(&conn, dialog.candidate_id, chat_id.0, status)?;
        notify_other_holders(
            bot,
            chat_id,
            &moved,
            &format!("ℹ️ По кандидату {} принято решение: не выходим на оффер.", dialog.candidate_name),
        )
        .await;

        // A rejected candidate's personal data is not kept around.
        feedback::delete_user_data(&conn, dialog.candidate_id)?;
    }

    deps.dialogs.clear(chat_id.0)?;
    send_text(bot, deps, chat_id, &format!("Решение по {} записано.", dialog.candidate_name)).await?;

    if status == status::UNSUITABLE {
        let _ = send_text(
            bot,
            deps,
            ChatId(dialog.candidate_id),
            "Спасибо, что уделили нам время. К сожалению, сейчас мы не готовы сделать предложение.",
        )
        .await;
    }
    Ok(())
}

/// Notifies the other task holders and strips the keyboards from their
/// task cards. Skips the decider's own chat.
async fn notify_other_holders(bot: &Bot, decider: ChatId, moved: &[feedback::PendingFeedback], text: &str) {
    for task in moved {
        if task.manager_id == decider.0 {
            continue;
        }
        let holder = ChatId(task.manager_id);
        if let Err(e) = bot
            .edit_message_reply_markup(holder, MessageId(task.message_id as i32))
            .await
        {
            log::debug!("Could not strip keyboard for {}: {}", task.manager_id, e);
        }
        if let Err(e) = bot.send_message(holder, text).await {
            log::warn!("Could not notify task holder {}: {}", task.manager_id, e);
        }
    }
}

/// Marks the employee active once the manager confirms the first shift
/// actually happened. Exposed for the no-show follow-up.
pub fn activate_candidate(deps: &HandlerDeps, candidate_id: i64) -> AppResult<bool> {
    let conn = get_connection(&deps.db_pool)?;
    employees::set_employee_active(&conn, candidate_id, true)
}
