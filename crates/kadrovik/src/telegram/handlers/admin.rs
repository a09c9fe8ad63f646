//! Admin panel: manager requests, employee list, stats, climate broadcast,
//! outbox status.

use teloxide::prelude::*;

use crate::core::config;
use crate::core::error::AppResult;
use crate::storage::{employees, feedback, get_connection, managers, outbox, surveys as survey_store};
use crate::telegram::handlers::survey_flow;
use crate::telegram::handlers::types::{send_text, send_with_keyboard, HandlerDeps};
use crate::telegram::keyboards;
use crate::telegram::state::SurveyKind;

/// /admin entry menu, admins only.
pub async fn admin_panel(bot: &Bot, deps: &HandlerDeps, chat_id: ChatId) -> AppResult<()> {
    send_with_keyboard(bot, deps, chat_id, "Панель администратора", keyboards::admin_menu_keyboard()).await?;
    Ok(())
}

/// `adm:*` callbacks. The caller has already checked admin rights.
pub async fn handle_admin_callback(bot: &Bot, deps: &HandlerDeps, query: &CallbackQuery, data: &str) -> AppResult<()> {
    bot.answer_callback_query(query.id.clone()).await?;
    let Some(message) = query.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;

    match data {
        "adm:pending" => show_pending_managers(bot, deps, chat_id).await,
        "adm:stats" => show_stats(bot, deps, chat_id).await,
        "adm:queue" => show_queue_status(bot, deps, chat_id).await,
        "adm:climate" => {
            let count = {
                let conn = get_connection(&deps.db_pool)?;
                employees::active_employee_ids(&conn)?.len()
            };
            send_with_keyboard(
                bot,
                deps,
                chat_id,
                &format!("Разослать анонимный климат-опрос {count} активным сотрудникам?"),
                keyboards::climate_confirm_keyboard(),
            )
            .await?;
            Ok(())
        }
        "adm:climate_go" => {
            let _ = bot.edit_message_reply_markup(chat_id, message.id()).await;
            broadcast_climate(bot, deps, chat_id).await
        }
        "adm:climate_cancel" => {
            let _ = bot.edit_message_reply_markup(chat_id, message.id()).await;
            send_text(bot, deps, chat_id, "Рассылка отменена.").await?;
            Ok(())
        }
        _ => {
            if let Some(page) = data.strip_prefix("adm:emp:").and_then(|s| s.parse::<usize>().ok()) {
                show_employees_page(bot, deps, chat_id, page).await
            } else {
                Ok(())
            }
        }
    }
}

/// Handles `emp:tg:<user_id>:<page>`: toggles an employee active flag in place.
pub async fn handle_employee_toggle(bot: &Bot, deps: &HandlerDeps, query: &CallbackQuery, data: &str) -> AppResult<()> {
    bot.answer_callback_query(query.id.clone()).await?;
    let Some(message) = query.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;

    let mut parts = data.split(':').skip(2);
    let (Some(user_id), Some(page)) = (
        parts.next().and_then(|s| s.parse::<i64>().ok()),
        parts.next().and_then(|s| s.parse::<usize>().ok()),
    ) else {
        return Ok(());
    };

    let (rows, total) = {
        let conn = get_connection(&deps.db_pool)?;
        let currently_active = employees::active_employee_ids(&conn)?.contains(&user_id);
        employees::set_employee_active(&conn, user_id, !currently_active)?;
        employees::list_employees_page(&conn, page, config::pagination::EMPLOYEES_PER_PAGE)?
    };

    let _ = bot
        .edit_message_reply_markup(chat_id, message.id())
        .reply_markup(keyboards::employees_keyboard(&rows, page, total))
        .await;
    Ok(())
}

async fn show_pending_managers(bot: &Bot, deps: &HandlerDeps, chat_id: ChatId) -> AppResult<()> {
    let pending = {
        let conn = get_connection(&deps.db_pool)?;
        managers::list_pending_managers(&conn)?
    };

    if pending.is_empty() {
        send_text(bot, deps, chat_id, "Новых заявок нет.").await?;
        return Ok(());
    }

    for p in pending {
        let text = format!(
            "👤 {}\nРесторан: {}\nID: {}",
            p.full_name,
            config::restaurant_name(&p.restaurant_code),
            p.user_id
        );
        send_with_keyboard(bot, deps, chat_id, &text, keyboards::manager_approval_keyboard(p.user_id)).await?;
    }
    Ok(())
}

async fn show_employees_page(bot: &Bot, deps: &HandlerDeps, chat_id: ChatId, page: usize) -> AppResult<()> {
    let (rows, total) = {
        let conn = get_connection(&deps.db_pool)?;
        employees::list_employees_page(&conn, page, config::pagination::EMPLOYEES_PER_PAGE)?
    };

    if rows.is_empty() {
        send_text(bot, deps, chat_id, "Сотрудников пока нет.").await?;
        return Ok(());
    }

    let per_page = config::pagination::EMPLOYEES_PER_PAGE;
    let pages = total.div_ceil(per_page);
    let header = format!(
        "👥 Сотрудники — стр. {}/{} (всего {})\n🟢 активен · ⚪️ не активен\nНажмите на строку, чтобы переключить.",
        page + 1,
        pages.max(1),
        total
    );
    send_with_keyboard(bot, deps, chat_id, &header, keyboards::employees_keyboard(&rows, page, total)).await?;
    Ok(())
}

async fn show_stats(bot: &Bot, deps: &HandlerDeps, chat_id: ChatId) -> AppResult<()> {
    let (survey_rows, decision_rows, employee_rows) = {
        let conn = get_connection(&deps.db_pool)?;
        (
            survey_store::survey_counts(&conn)?,
            feedback::history_count_by_status(&conn)?,
            employees::employee_stats(&conn)?,
        )
    };

    let mut lines = vec!["📊 Статистика".to_string(), String::new(), "Опросы:".to_string()];
    if survey_rows.is_empty() {
        lines.push("— пока пусто".to_string());
    }
    for (survey_type, count) in survey_rows {
        lines.push(format!("• {survey_type}: {count}"));
    }

    lines.push(String::new());
    lines.push("Решения по кандидатам:".to_string());
    if decision_rows.is_empty() {
        lines.push("— пока пусто".to_string());
    }
    for (status, count) in decision_rows {
        lines.push(format!("• {status}: {count}"));
    }

    lines.push(String::new());
    lines.push("Сотрудники (активные/не активные):".to_string());
    if employee_rows.is_empty() {
        lines.push("— пока пусто".to_string());
    }
    for (code, active, inactive) in employee_rows {
        lines.push(format!("• {}: {active}/{inactive}", config::restaurant_name(&code)));
    }

    send_text(bot, deps, chat_id, &lines.join("\n")).await?;
    Ok(())
}

async fn show_queue_status(bot: &Bot, deps: &HandlerDeps, chat_id: ChatId) -> AppResult<()> {
    let (pending, parked) = {
        let conn = get_connection(&deps.db_pool)?;
        (
            outbox::pending_count(&conn, config::queue::MAX_WRITE_ATTEMPTS)?,
            outbox::parked_count(&conn, config::queue::MAX_WRITE_ATTEMPTS)?,
        )
    };
    send_text(
        bot,
        deps,
        chat_id,
        &format!("📤 Очередь выгрузки\nОжидает записи: {pending}\nОтложено после ошибок: {parked}"),
    )
    .await?;
    Ok(())
}

/// Starts the anonymous climate survey for every active employee.
///
/// Employees mid-dialog are skipped, not interrupted; the admin gets the
/// skip count in the report.
async fn broadcast_climate(bot: &Bot, deps: &HandlerDeps, admin_chat: ChatId) -> AppResult<()> {
    let targets = {
        let conn = get_connection(&deps.db_pool)?;
        employees::active_employee_ids(&conn)?
    };

    let mut started = 0usize;
    let mut skipped = 0usize;
    for user_id in targets {
        if matches!(deps.dialogs.load(user_id), Ok(Some(_))) {
            skipped += 1;
            continue;
        }
        match survey_flow::start_survey(bot, deps, ChatId(user_id), SurveyKind::Climate, None).await {
            Ok(()) => started += 1,
            Err(e) => {
                skipped += 1;
                log::warn!("Climate broadcast to {} failed: {}", user_id, e);
            }
        }
    }

    send_text(
        bot,
        deps,
        admin_chat,
        &format!("Климат-опрос разослан. Начали: {started}, пропущено: {skipped}."),
    )
    .await?;
    Ok(())
}
