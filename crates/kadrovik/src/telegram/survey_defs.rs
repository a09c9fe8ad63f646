//! Question tables for every survey type.
//!
//! Adding a question is a data change: the driver, the progress bar, and the
//! spreadsheet row all follow the table.

use crate::core::config::sheet;
use crate::telegram::state::SurveyKind;
use crate::telegram::surveys::{StepInput, SurveyDef, SurveyStep, Validator};

const SCALE_1_5: &[&str] = &["1", "2", "3", "4", "5"];

/// Анкета кандидата перед собеседованием.
pub static RECRUITMENT: SurveyDef = SurveyDef {
    kind: SurveyKind::Recruitment,
    title: "Анкета кандидата",
    sheet: sheet::INTERVIEWS,
    steps: &[
        SurveyStep {
            key: "full_name",
            prompt: "Как вас зовут? Укажите фамилию и имя.",
            input: StepInput::Text(Validator::FullName),
        },
        SurveyStep {
            key: "age",
            prompt: "Сколько вам лет?",
            input: StepInput::Text(Validator::Age),
        },
        SurveyStep {
            key: "phone",
            prompt: "Укажите номер телефона для связи.",
            input: StepInput::Text(Validator::Phone),
        },
        SurveyStep {
            key: "citizenship",
            prompt: "Ваше гражданство?",
            input: StepInput::Choice(&["РФ", "ЕАЭС", "Другое"]),
        },
        SurveyStep {
            key: "district",
            prompt: "В каком районе вы живёте? Укажите ближайшее метро.",
            input: StepInput::Text(Validator::None),
        },
        SurveyStep {
            key: "medical_book",
            prompt: "Есть ли у вас действующая медицинская книжка?",
            input: StepInput::Choice(&["Да", "Нет", "В процессе оформления"]),
        },
        SurveyStep {
            key: "position",
            prompt: "На какую позицию вы претендуете?",
            input: StepInput::Choice(&["Повар", "Кассир", "Официант", "Курьер", "Менеджер зала"]),
        },
        SurveyStep {
            key: "experience",
            prompt: "Расскажите о вашем опыте работы в общепите.",
            input: StepInput::Text(Validator::MinLen(10)),
        },
        SurveyStep {
            key: "last_job",
            prompt: "Где вы работали в последний раз?",
            input: StepInput::Text(Validator::None),
        },
        SurveyStep {
            key: "reason_left",
            prompt: "Почему вы ушли с прошлого места работы?",
            input: StepInput::Text(Validator::MinLen(10)),
        },
        SurveyStep {
            key: "schedule",
            prompt: "Какой график вам подходит?",
            input: StepInput::Choice(&["2/2", "5/2", "Гибкий", "Подработка"]),
        },
        SurveyStep {
            key: "desired_income",
            prompt: "Какой уровень дохода вы рассматриваете?",
            input: StepInput::Text(Validator::None),
        },
        SurveyStep {
            key: "start_date",
            prompt: "Когда вы готовы выйти на стажировку?",
            input: StepInput::Text(Validator::None),
        },
        SurveyStep {
            key: "strengths",
            prompt: "Назовите ваши сильные стороны.",
            input: StepInput::Text(Validator::MinLen(10)),
        },
        SurveyStep {
            key: "conflict_case",
            prompt: "Опишите случай, когда вам пришлось разрешать конфликт с гостем или коллегой.",
            input: StepInput::Text(Validator::MinLen(10)),
        },
        SurveyStep {
            key: "why_us",
            prompt: "Почему вы хотите работать именно у нас?",
            input: StepInput::Text(Validator::MinLen(10)),
        },
        SurveyStep {
            key: "questions",
            prompt: "Остались ли у вас вопросы к нам? Если нет, напишите «нет».",
            input: StepInput::Text(Validator::None),
        },
        SurveyStep {
            key: "source",
            prompt: "Откуда вы узнали о вакансии? Можно выбрать несколько вариантов.",
            input: StepInput::MultiChoice(&["hh.ru", "Авито", "Телеграм", "Знакомые", "Другое"]),
        },
    ],
};

/// Обратная связь после первых смен.
pub static ONBOARDING: SurveyDef = SurveyDef {
    kind: SurveyKind::Onboarding,
    title: "Как проходит адаптация",
    sheet: sheet::ONBOARDING,
    steps: &[
        SurveyStep {
            key: "first_days",
            prompt: "Как прошли ваши первые смены?",
            input: StepInput::Choice(&["Отлично", "Нормально", "Тяжело"]),
        },
        SurveyStep {
            key: "mentor",
            prompt: "Помогал ли вам наставник?",
            input: StepInput::Choice(&["Да", "Частично", "Нет"]),
        },
        SurveyStep {
            key: "expectations",
            prompt: "Совпали ли условия работы с тем, что обсуждали на собеседовании?",
            input: StepInput::Choice(&["Да", "Не совсем", "Нет"]),
        },
        SurveyStep {
            key: "comment",
            prompt: "Что можно улучшить в адаптации новичков? Если всё устраивает, напишите «всё хорошо».",
            input: StepInput::Text(Validator::None),
        },
    ],
};

/// Выходное интервью при увольнении.
pub static EXIT_INTERVIEW: SurveyDef = SurveyDef {
    kind: SurveyKind::ExitInterview,
    title: "Выходное интервью",
    sheet: sheet::EXIT_INTERVIEWS,
    steps: &[
        SurveyStep {
            key: "position",
            prompt: "На какой позиции вы работали?",
            input: StepInput::Text(Validator::None),
        },
        SurveyStep {
            key: "duration",
            prompt: "Как долго вы проработали в компании?",
            input: StepInput::Choice(&["Меньше месяца", "1–6 месяцев", "6–12 месяцев", "Больше года"]),
        },
        SurveyStep {
            key: "leave_reason",
            prompt: "Что стало главной причиной ухода?",
            input: StepInput::Text(Validator::MinLen(10)),
        },
        SurveyStep {
            key: "liked",
            prompt: "Что вам нравилось в работе?",
            input: StepInput::Text(Validator::MinLen(10)),
        },
        SurveyStep {
            key: "improve",
            prompt: "Что компании стоит изменить в первую очередь?",
            input: StepInput::Text(Validator::MinLen(10)),
        },
        SurveyStep {
            key: "recommend",
            prompt: "Порекомендовали бы вы нас как работодателя?",
            input: StepInput::Choice(&["Да", "Нет", "Затрудняюсь ответить"]),
        },
    ],
};

/// Анонимный опрос климата в команде. Ответы не привязываются к сотруднику.
pub static CLIMATE: SurveyDef = SurveyDef {
    kind: SurveyKind::Climate,
    title: "Опрос о работе в команде",
    sheet: sheet::CLIMATE,
    steps: &[
        SurveyStep {
            key: "satisfaction",
            prompt: "Насколько вы довольны работой в целом? (1 — совсем нет, 5 — полностью)",
            input: StepInput::Choice(SCALE_1_5),
        },
        SurveyStep {
            key: "workload",
            prompt: "Оцените вашу рабочую нагрузку. (1 — непосильная, 5 — комфортная)",
            input: StepInput::Choice(SCALE_1_5),
        },
        SurveyStep {
            key: "management",
            prompt: "Оцените работу вашего менеджера. (1 — плохо, 5 — отлично)",
            input: StepInput::Choice(SCALE_1_5),
        },
        SurveyStep {
            key: "team",
            prompt: "Оцените атмосферу в команде. (1 — тяжёлая, 5 — отличная)",
            input: StepInput::Choice(SCALE_1_5),
        },
        SurveyStep {
            key: "growth",
            prompt: "Видите ли вы возможности для роста в компании? (1 — нет, 5 — да)",
            input: StepInput::Choice(SCALE_1_5),
        },
        SurveyStep {
            key: "stress_factors",
            prompt: "Что мешает работать? Можно выбрать несколько вариантов.",
            input: StepInput::MultiChoice(&[
                "График",
                "Нагрузка",
                "Оплата",
                "Отношения в команде",
                "Оборудование",
                "Ничего",
            ]),
        },
        SurveyStep {
            key: "improve",
            prompt: "Что бы вы изменили в первую очередь?",
            input: StepInput::Text(Validator::MinLen(10)),
        },
    ],
};

/// Короткая оценка собеседования с ботом, отправляется кандидату позже.
pub static CANDIDATE_FEEDBACK: SurveyDef = SurveyDef {
    kind: SurveyKind::CandidateFeedback,
    title: "Пара вопросов о собеседовании",
    sheet: sheet::CANDIDATE_FEEDBACK,
    steps: &[
        SurveyStep {
            key: "convenience",
            prompt: "Насколько удобно было проходить собеседование в боте? (1 — неудобно, 5 — очень удобно)",
            input: StepInput::Choice(SCALE_1_5),
        },
        SurveyStep {
            key: "clarity",
            prompt: "Насколько понятны были вопросы? (1 — непонятны, 5 — полностью понятны)",
            input: StepInput::Choice(SCALE_1_5),
        },
        SurveyStep {
            key: "duration",
            prompt: "Как вам длительность анкеты?",
            input: StepInput::Choice(&["Быстро", "Нормально", "Долго"]),
        },
        SurveyStep {
            key: "comment",
            prompt: "Что можно улучшить? Если всё понравилось, напишите «всё отлично».",
            input: StepInput::Text(Validator::None),
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    fn all_defs() -> [&'static SurveyDef; 5] {
        [
            &RECRUITMENT,
            &ONBOARDING,
            &EXIT_INTERVIEW,
            &CLIMATE,
            &CANDIDATE_FEEDBACK,
        ]
    }

    #[test]
    fn test_answer_keys_are_unique_within_each_survey() {
        for def in all_defs() {
            let mut keys: Vec<_> = def.steps.iter().map(|s| s.key).collect();
            keys.sort_unstable();
            keys.dedup();
            assert_eq!(keys.len(), def.steps.len(), "duplicate keys in {}", def.title);
        }
    }

    #[test]
    fn test_keyboard_steps_have_options() {
        for def in all_defs() {
            for step in def.steps {
                match step.input {
                    StepInput::Choice(options) | StepInput::MultiChoice(options) => {
                        assert!(!options.is_empty(), "empty options for {}", step.key);
                    }
                    StepInput::Text(_) => {}
                }
            }
        }
    }
}
