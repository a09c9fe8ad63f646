//! Dispatcher schema and handler chain builders.
//!
//! Message routing is state-driven: the persisted dialog for the chat picks
//! the handler, so a restart mid-questionnaire resumes where the user left
//! off. Callback routing is prefix-driven and re-checks state where a stale
//! button press would otherwise corrupt a dialog.

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use crate::core::config;
use crate::telegram::bot::Command;
use crate::telegram::handlers::types::{send_text, HandlerDeps, HandlerError};
use crate::telegram::handlers::{admin, decision, followup, manager, start, survey_flow};
use crate::telegram::state::{DialogState, ManagerRegStep};

/// The complete handler tree for the bot.
///
/// The same schema is used in production and in integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callback))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command {:?} from chat {}", cmd, msg.chat.id);

                match cmd {
                    Command::Start(payload) => {
                        start::handle_start(&bot, &deps, &msg, &payload).await?;
                    }
                    Command::Cancel => {
                        start::handle_cancel(&bot, &deps, &msg).await?;
                    }
                    Command::Feedback => {
                        start::handle_feedback(&bot, &deps, &msg).await?;
                    }
                    Command::RegisterManager => {
                        manager::start_registration(&bot, &deps, msg.chat.id).await?;
                    }
                    Command::Admin => {
                        if config::admin::is_admin(msg.chat.id.0) {
                            admin::admin_panel(&bot, &deps, msg.chat.id).await?;
                        } else {
                            send_text(&bot, &deps, msg.chat.id, "Эта команда доступна только администраторам.").await?;
                        }
                    }
                }
                Ok(())
            }
        },
    ))
}

/// Plain text messages are routed by the chat's persisted dialog state.
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some() && msg.chat.is_private())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let chat_id = msg.chat.id;

                match deps.dialogs.load(chat_id.0)? {
                    Some(DialogState::Survey(dialog)) => {
                        survey_flow::handle_survey_message(&bot, &deps, &msg, dialog).await?;
                    }
                    Some(DialogState::ManagerRegistration { step }) => match step {
                        ManagerRegStep::ChooseRestaurant => {
                            send_text(&bot, &deps, chat_id, "Пожалуйста, выберите ресторан кнопкой выше.").await?;
                        }
                        ManagerRegStep::FullName { restaurant_code } => {
                            manager::handle_full_name_message(&bot, &deps, &msg, &restaurant_code).await?;
                        }
                    },
                    Some(DialogState::ManagerDecision(dialog)) => {
                        decision::handle_decision_message(&bot, &deps, &msg, dialog).await?;
                    }
                    Some(DialogState::BotFeedback) => {
                        survey_flow::handle_bot_feedback_message(&bot, &deps, &msg).await?;
                    }
                    Some(DialogState::RejectPendingManager { pending_user_id }) => {
                        manager::handle_reject_reason_message(&bot, &deps, &msg, pending_user_id).await?;
                    }
                    Some(DialogState::NoShowReason { restaurant_code }) => {
                        followup::handle_noshow_reason_message(&bot, &deps, &msg, &restaurant_code).await?;
                    }
                    None => {
                        send_text(&bot, &deps, chat_id, "Я отвечаю только на команды. Начните со /start.").await?;
                    }
                }
                Ok(())
            }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            let Some(data) = q.data.clone() else {
                return Ok(());
            };
            let user_id = q.from.id.0 as i64;

            if data.starts_with("ans:") || data.starts_with("mch:") {
                // Survey buttons only make sense inside a live survey.
                match deps.dialogs.load(user_id)? {
                    Some(DialogState::Survey(dialog)) => {
                        survey_flow::handle_survey_callback(&bot, &deps, &q, dialog, &data).await?;
                    }
                    _ => {
                        bot.answer_callback_query(q.id.clone()).await?;
                    }
                }
            } else if let Some(code) = data.strip_prefix("rest:") {
                match deps.dialogs.load(user_id)? {
                    Some(DialogState::ManagerRegistration { .. }) => {
                        manager::handle_restaurant_callback(&bot, &deps, &q, code).await?;
                    }
                    _ => {
                        bot.answer_callback_query(q.id.clone()).await?;
                    }
                }
            } else if let Some(rest) = data.strip_prefix("dec:") {
                if let Some((status, feedback_id)) = rest.split_once(':') {
                    decision::handle_decision_callback(&bot, &deps, &q, status, feedback_id).await?;
                }
            } else if let Some(feedback_id) = data.strip_prefix("rep:") {
                survey_flow::handle_report_callback(&bot, &deps, &q, feedback_id).await?;
            } else if let Some(id) = data.strip_prefix("mgr:ok:").and_then(|s| s.parse::<i64>().ok()) {
                if config::admin::is_admin(user_id) {
                    manager::handle_approve_callback(&bot, &deps, &q, id).await?;
                }
            } else if let Some(id) = data.strip_prefix("mgr:no:").and_then(|s| s.parse::<i64>().ok()) {
                if config::admin::is_admin(user_id) {
                    manager::handle_reject_callback(&bot, &deps, &q, id).await?;
                }
            } else if data.starts_with("adm:") {
                if config::admin::is_admin(user_id) {
                    admin::handle_admin_callback(&bot, &deps, &q, &data).await?;
                }
            } else if data.starts_with("emp:tg:") {
                if config::admin::is_admin(user_id) {
                    admin::handle_employee_toggle(&bot, &deps, &q, &data).await?;
                }
            } else if let Some(code) = data.strip_prefix("onb:yes:") {
                followup::handle_shift_confirmed(&bot, &deps, &q, code).await?;
            } else if let Some(code) = data.strip_prefix("onb:no:") {
                followup::handle_shift_missed(&bot, &deps, &q, code).await?;
            } else if data == "tasks" {
                bot.answer_callback_query(q.id.clone()).await?;
                manager::show_manager_tasks(&bot, &deps, ChatId(user_id)).await?;
            } else {
                log::debug!("Unrecognized callback data from {}: {}", user_id, data);
                bot.answer_callback_query(q.id.clone()).await?;
            }
            Ok(())
        }
    })
}
