//! Inline keyboard builders.
//!
//! Callback data layout is colon-separated: `ans:<idx>`, `mch:<idx>`,
//! `dec:<status>:<feedback_id>` and so on. Parsing lives in the callback
//! handler; builders and parsers are kept in sync by the tests below.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::core::config;
use crate::storage::employees::Employee;

/// Keyboard for a single-choice survey step.
///
/// Short options (ratings) are packed into one row, long ones stacked.
pub fn choice_keyboard(options: &[&str]) -> InlineKeyboardMarkup {
    let pack_in_row = options.iter().all(|o| o.chars().count() <= 2);

    let rows: Vec<Vec<InlineKeyboardButton>> = if pack_in_row {
        vec![options
            .iter()
            .enumerate()
            .map(|(i, option)| InlineKeyboardButton::callback((*option).to_string(), format!("ans:{i}")))
            .collect()]
    } else {
        options
            .iter()
            .enumerate()
            .map(|(i, option)| vec![InlineKeyboardButton::callback((*option).to_string(), format!("ans:{i}"))])
            .collect()
    };

    InlineKeyboardMarkup::new(rows)
}

/// Keyboard for a multi-choice step, with the current selection marked.
pub fn multi_choice_keyboard(options: &[&str], selected: &[String]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = options
        .iter()
        .enumerate()
        .map(|(i, option)| {
            let marked = selected.iter().any(|s| s == option);
            let label = if marked {
                format!("✅ {option}")
            } else {
                (*option).to_string()
            };
            vec![InlineKeyboardButton::callback(label, format!("mch:{i}"))]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback("Готово ▶️", "mch:done")]);

    InlineKeyboardMarkup::new(rows)
}

/// Restaurant picker used by manager registration.
pub fn restaurants_keyboard() -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = config::RESTAURANTS
        .iter()
        .map(|(code, name)| vec![InlineKeyboardButton::callback(name.clone(), format!("rest:{code}"))])
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Decision buttons on a candidate task card.
pub fn decision_keyboard(feedback_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "✅ Пригласить на стажировку",
            format!("dec:invite:{feedback_id}"),
        )],
        vec![InlineKeyboardButton::callback(
            "🚫 Не подходит",
            format!("dec:unsuitable:{feedback_id}"),
        )],
        vec![InlineKeyboardButton::callback(
            "🙅 Кандидат отказался",
            format!("dec:refused:{feedback_id}"),
        )],
        vec![InlineKeyboardButton::callback(
            "📄 Полная анкета",
            format!("rep:{feedback_id}"),
        )],
    ])
}

/// Approve/reject buttons under a manager registration request.
pub fn manager_approval_keyboard(user_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Одобрить", format!("mgr:ok:{user_id}")),
        InlineKeyboardButton::callback("❌ Отклонить", format!("mgr:no:{user_id}")),
    ]])
}

/// Admin panel entry menu.
pub fn admin_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("👤 Заявки менеджеров", "adm:pending")],
        vec![InlineKeyboardButton::callback("👥 Сотрудники", "adm:emp:0")],
        vec![InlineKeyboardButton::callback("📊 Статистика", "adm:stats")],
        vec![InlineKeyboardButton::callback("🌡 Запустить климат-опрос", "adm:climate")],
        vec![InlineKeyboardButton::callback("📤 Очередь выгрузки", "adm:queue")],
    ])
}

/// Paged employee list with per-row active-flag toggles.
pub fn employees_keyboard(employees: &[Employee], page: usize, total: usize) -> InlineKeyboardMarkup {
    let per_page = config::pagination::EMPLOYEES_PER_PAGE;
    let mut rows: Vec<Vec<InlineKeyboardButton>> = employees
        .iter()
        .map(|e| {
            let flag = if e.is_active { "🟢" } else { "⚪️" };
            let label = format!("{flag} {} · {}", e.full_name, config::restaurant_name(&e.restaurant_code));
            vec![InlineKeyboardButton::callback(label, format!("emp:tg:{}:{page}", e.user_id))]
        })
        .collect();

    let last_page = total.saturating_sub(1) / per_page.max(1);
    let mut nav = Vec::new();
    if page > 0 {
        nav.push(InlineKeyboardButton::callback("◀️", format!("adm:emp:{}", page - 1)));
    }
    if page < last_page {
        nav.push(InlineKeyboardButton::callback("▶️", format!("adm:emp:{}", page + 1)));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }

    InlineKeyboardMarkup::new(rows)
}

/// Confirmation step before the climate survey broadcast.
pub fn climate_confirm_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("🚀 Разослать", "adm:climate_go"),
        InlineKeyboardButton::callback("Отмена", "adm:climate_cancel"),
    ]])
}

/// Yes/no question for the scheduled no-show check.
pub fn noshow_keyboard(restaurant_code: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Да, вышел", format!("onb:yes:{restaurant_code}")),
        InlineKeyboardButton::callback("❌ Нет", format!("onb:no:{restaurant_code}")),
    ]])
}

/// Main menu shown to registered managers.
pub fn manager_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "📋 Мои кандидаты",
        "tasks",
    )]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback_data(markup: &InlineKeyboardMarkup) -> Vec<String> {
        use teloxide::types::InlineKeyboardButtonKind;
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_rating_options_pack_into_one_row() {
        let markup = choice_keyboard(&["1", "2", "3", "4", "5"]);
        assert_eq!(markup.inline_keyboard.len(), 1);
        assert_eq!(markup.inline_keyboard[0].len(), 5);
    }

    #[test]
    fn test_long_options_stack() {
        let markup = choice_keyboard(&["Да", "Нет", "В процессе оформления"]);
        assert_eq!(markup.inline_keyboard.len(), 3);
    }

    #[test]
    fn test_decision_callback_data_fits_telegram_limit() {
        // Telegram caps callback data at 64 bytes
        let feedback_id = "0195a2f4-7c1e-7b32-b1da-4a9c57a1b2c3";
        let markup = decision_keyboard(feedback_id);
        for data in callback_data(&markup) {
            assert!(data.len() <= 64, "too long: {data}");
        }
    }

    #[test]
    fn test_multi_choice_marks_selection() {
        let markup = multi_choice_keyboard(&["hh.ru", "Авито"], &["Авито".to_string()]);
        let labels: Vec<_> = markup.inline_keyboard.iter().flatten().map(|b| b.text.clone()).collect();
        assert!(labels.contains(&"hh.ru".to_string()));
        assert!(labels.contains(&"✅ Авито".to_string()));
        assert!(labels.iter().any(|l| l.starts_with("Готово")));
    }
}
