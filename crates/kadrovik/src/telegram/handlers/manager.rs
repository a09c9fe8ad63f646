//! Manager registration and admin approval.
//!
//! A manager picks their restaurant, types their full name, and waits.
//! Admins get the request with approve/reject buttons; rejection asks the
//! admin for a reason that is forwarded to the requester.

use teloxide::prelude::*;

use crate::core::config;
use crate::core::error::AppResult;
use crate::storage::{feedback, get_connection, managers};
use crate::telegram::handlers::types::{send_text, send_with_keyboard, HandlerDeps};
use crate::telegram::keyboards;
use crate::telegram::state::{DialogState, ManagerRegStep};

/// /register_manager opens the restaurant picker.
pub async fn start_registration(bot: &Bot, deps: &HandlerDeps, chat_id: ChatId) -> AppResult<()> {
    {
        let conn = get_connection(&deps.db_pool)?;
        if managers::is_manager(&conn, chat_id.0)? {
            send_text(bot, deps, chat_id, "Вы уже зарегистрированы как менеджер.").await?;
            return Ok(());
        }
    }

    send_with_keyboard(
        bot,
        deps,
        chat_id,
        "В каком ресторане вы работаете?",
        keyboards::restaurants_keyboard(),
    )
    .await?;
    deps.dialogs.save(
        chat_id.0,
        &DialogState::ManagerRegistration {
            step: ManagerRegStep::ChooseRestaurant,
        },
    )?;
    Ok(())
}

/// Handles `rest:<code>`: restaurant picked, ask for the full name.
pub async fn handle_restaurant_callback(
    bot: &Bot,
    deps: &HandlerDeps,
    query: &CallbackQuery,
    code: &str,
) -> AppResult<()> {
    bot.answer_callback_query(query.id.clone()).await?;
    let Some(message) = query.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;

    let _ = bot.edit_message_reply_markup(chat_id, message.id()).await;
    send_text(
        bot,
        deps,
        chat_id,
        &format!(
            "Ресторан: {}.\nТеперь укажите вашу фамилию и имя.",
            config::restaurant_name(code)
        ),
    )
    .await?;
    deps.dialogs.save(
        chat_id.0,
        &DialogState::ManagerRegistration {
            step: ManagerRegStep::FullName {
                restaurant_code: code.to_string(),
            },
        },
    )?;
    Ok(())
}

/// Full name typed: store the request and page the admins.
pub async fn handle_full_name_message(
    bot: &Bot,
    deps: &HandlerDeps,
    msg: &Message,
    restaurant_code: &str,
) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let full_name = msg.text().unwrap_or_default().trim().to_string();

    if full_name.split_whitespace().count() < config::validation::MIN_NAME_WORDS {
        send_text(bot, deps, chat_id, "Пожалуйста, укажите фамилию и имя полностью.").await?;
        return Ok(());
    }

    {
        let conn = get_connection(&deps.db_pool)?;
        managers::add_pending_manager(&conn, chat_id.0, restaurant_code, &full_name)?;
    }
    deps.dialogs.clear(chat_id.0)?;

    send_text(
        bot,
        deps,
        chat_id,
        "Заявка отправлена администратору. Мы сообщим, когда её рассмотрят.",
    )
    .await?;

    let request_text = format!(
        "👤 Заявка на регистрацию менеджера\n\n{}\nРесторан: {}\nID: {}",
        full_name,
        config::restaurant_name(restaurant_code),
        chat_id.0
    );
    for admin_id in config::admin::ADMIN_IDS.iter() {
        if let Err(e) = bot
            .send_message(ChatId(*admin_id), &request_text)
            .reply_markup(keyboards::manager_approval_keyboard(chat_id.0))
            .await
        {
            log::error!("Failed to page admin {} about manager request: {}", admin_id, e);
        }
    }
    Ok(())
}

/// Handles `mgr:ok:<user_id>`: admin approved the request.
pub async fn handle_approve_callback(bot: &Bot, deps: &HandlerDeps, query: &CallbackQuery, user_id: i64) -> AppResult<()> {
    bot.answer_callback_query(query.id.clone()).await?;

    let pending = {
        let conn = get_connection(&deps.db_pool)?;
        let pending = managers::take_pending_manager(&conn, user_id)?;
        if let Some(p) = &pending {
            managers::add_manager(&conn, p.user_id, &p.restaurant_code, &p.full_name)?;
        }
        pending
    };

    let Some(message) = query.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let _ = bot.edit_message_reply_markup(chat_id, message.id()).await;

    match pending {
        Some(p) => {
            send_text(bot, deps, chat_id, &format!("✅ {} теперь менеджер.", p.full_name)).await?;
            let _ = send_with_keyboard(
                bot,
                deps,
                ChatId(p.user_id),
                "Ваша заявка одобрена! Теперь вам будут приходить анкеты кандидатов.",
                keyboards::manager_menu_keyboard(),
            )
            .await;
        }
        // Another admin got there first.
        None => {
            send_text(bot, deps, chat_id, "Эта заявка уже рассмотрена.").await?;
        }
    }
    Ok(())
}

/// Handles `mgr:no:<user_id>`: admin rejects; ask them for a reason first.
pub async fn handle_reject_callback(bot: &Bot, deps: &HandlerDeps, query: &CallbackQuery, user_id: i64) -> AppResult<()> {
    bot.answer_callback_query(query.id.clone()).await?;
    let Some(message) = query.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;

    let exists = {
        let conn = get_connection(&deps.db_pool)?;
        managers::list_pending_managers(&conn)?.iter().any(|p| p.user_id == user_id)
    };
    if !exists {
        let _ = bot.edit_message_reply_markup(chat_id, message.id()).await;
        send_text(bot, deps, chat_id, "Эта заявка уже рассмотрена.").await?;
        return Ok(());
    }

    send_text(bot, deps, chat_id, "Укажите причину отказа одним сообщением.").await?;
    deps.dialogs.save(
        chat_id.0,
        &DialogState::RejectPendingManager {
            pending_user_id: user_id,
        },
    )?;
    Ok(())
}

/// Admin typed the rejection reason.
pub async fn handle_reject_reason_message(
    bot: &Bot,
    deps: &HandlerDeps,
    msg: &Message,
    pending_user_id: i64,
) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let reason = msg.text().unwrap_or_default().trim().to_string();

    let pending = {
        let conn = get_connection(&deps.db_pool)?;
        managers::take_pending_manager(&conn, pending_user_id)?
    };
    deps.dialogs.clear(chat_id.0)?;

    match pending {
        Some(p) => {
            send_text(bot, deps, chat_id, &format!("Заявка {} отклонена.", p.full_name)).await?;
            let _ = send_text(
                bot,
                deps,
                ChatId(p.user_id),
                &format!("К сожалению, ваша заявка отклонена.\nПричина: {reason}"),
            )
            .await;
        }
        None => {
            send_text(bot, deps, chat_id, "Эта заявка уже рассмотрена.").await?;
        }
    }
    Ok(())
}

/// "Мои кандидаты": open tasks for this manager.
pub async fn show_manager_tasks(bot: &Bot, deps: &HandlerDeps, chat_id: ChatId) -> AppResult<()> {
    let tasks = {
        let conn = get_connection(&deps.db_pool)?;
        feedback::pending_for_manager(&conn, chat_id.0)?
    };

    if tasks.is_empty() {
        send_text(bot, deps, chat_id, "Открытых кандидатов нет. 👌").await?;
        return Ok(());
    }

    for task in tasks {
        let text = format!("👤 {} — ждёт вашего решения", task.candidate_name);
        send_with_keyboard(bot, deps, chat_id, &text, keyboards::decision_keyboard(&task.feedback_id)).await?;
    }
    Ok(())
}

/// Manager main menu, also reachable via /start for registered managers.
pub async fn show_manager_menu(bot: &Bot, deps: &HandlerDeps, chat_id: ChatId) -> AppResult<()> {
    let open_count = {
        let conn = get_connection(&deps.db_pool)?;
        feedback::pending_for_manager(&conn, chat_id.0)?.len()
    };
    send_with_keyboard(
        bot,
        deps,
        chat_id,
        &format!("Открытых кандидатов: {open_count}"),
        keyboards::manager_menu_keyboard(),
    )
    .await?;
    Ok(())
}
