//! Declarative survey definitions and the generic step driver.
//!
//! A survey is a static table of steps; the driver validates input, records
//! answers into the dialog, and reports whether the survey advanced,
//! re-prompted, or completed. The five survey types are data, not code.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::config;
use crate::telegram::state::{SurveyDialog, SurveyKind};

/// How a step accepts its answer.
#[derive(Debug, Clone, Copy)]
pub enum StepInput {
    /// Free text, checked by the validator
    Text(Validator),
    /// One of the listed options (inline keyboard)
    Choice(&'static [&'static str]),
    /// Any subset of the options, confirmed with a Done button
    MultiChoice(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub enum Validator {
    None,
    FullName,
    Age,
    Phone,
    MinLen(usize),
}

pub struct SurveyStep {
    /// Key the answer is stored under
    pub key: &'static str,
    pub prompt: &'static str,
    pub input: StepInput,
}

pub struct SurveyDef {
    pub kind: SurveyKind,
    pub title: &'static str,
    /// Spreadsheet tab completed surveys are routed to
    pub sheet: &'static str,
    pub steps: &'static [SurveyStep],
}

impl SurveyDef {
    pub fn step(&self, index: usize) -> Option<&SurveyStep> {
        self.steps.get(index)
    }
}

pub fn survey_def(kind: SurveyKind) -> &'static SurveyDef {
    match kind {
        SurveyKind::Recruitment => &super::survey_defs::RECRUITMENT,
        SurveyKind::Onboarding => &super::survey_defs::ONBOARDING,
        SurveyKind::ExitInterview => &super::survey_defs::EXIT_INTERVIEW,
        SurveyKind::Climate => &super::survey_defs::CLIMATE,
        SurveyKind::CandidateFeedback => &super::survey_defs::CANDIDATE_FEEDBACK,
    }
}

/// What a recorded answer did to the dialog.
#[derive(Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Answer stored, moved to the next step
    Advance,
    /// Input rejected, user-facing explanation attached
    Reprompt(String),
    /// Answer stored and that was the last step
    Complete,
}

/// Records a free-text answer for the current step.
pub fn answer_text(def: &SurveyDef, dialog: &mut SurveyDialog, text: &str) -> StepOutcome {
    let Some(step) = def.step(dialog.step) else {
        return StepOutcome::Complete;
    };

    match step.input {
        StepInput::Text(validator) => match validate(validator, text) {
            Ok(value) => record(def, dialog, step.key, serde_json::Value::String(value)),
            Err(reason) => StepOutcome::Reprompt(reason),
        },
        // Keyboard steps do not accept typed text
        StepInput::Choice(_) | StepInput::MultiChoice(_) => {
            StepOutcome::Reprompt("Пожалуйста, выберите вариант кнопкой под сообщением.".to_string())
        }
    }
}

/// Records a single-choice answer picked from the keyboard.
pub fn answer_choice(def: &SurveyDef, dialog: &mut SurveyDialog, option_index: usize) -> StepOutcome {
    let Some(step) = def.step(dialog.step) else {
        return StepOutcome::Complete;
    };

    let StepInput::Choice(options) = step.input else {
        return StepOutcome::Reprompt("Этот вопрос ждёт другого ответа.".to_string());
    };
    let Some(option) = options.get(option_index) else {
        return StepOutcome::Reprompt("Неизвестный вариант ответа.".to_string());
    };

    record(def, dialog, step.key, serde_json::Value::String((*option).to_string()))
}

/// Toggles one option of the current multi-choice step.
/// Returns the updated selection so the caller can redraw the keyboard.
pub fn toggle_multi_choice<'a>(
    def: &'a SurveyDef,
    dialog: &mut SurveyDialog,
    option_index: usize,
) -> Option<&'a [&'static str]> {
    let step = def.step(dialog.step)?;
    let StepInput::MultiChoice(options) = step.input else {
        return None;
    };
    let option = (*options.get(option_index)?).to_string();

    if let Some(pos) = dialog.selected.iter().position(|s| *s == option) {
        dialog.selected.remove(pos);
    } else {
        dialog.selected.push(option);
    }
    Some(options)
}

/// Confirms the multi-choice selection (Done button).
pub fn finish_multi_choice(def: &SurveyDef, dialog: &mut SurveyDialog) -> StepOutcome {
    let Some(step) = def.step(dialog.step) else {
        return StepOutcome::Complete;
    };
    if !matches!(step.input, StepInput::MultiChoice(_)) {
        return StepOutcome::Reprompt("Этот вопрос ждёт другого ответа.".to_string());
    }
    if dialog.selected.is_empty() {
        return StepOutcome::Reprompt("Отметьте хотя бы один вариант.".to_string());
    }

    let value = serde_json::Value::String(dialog.selected.join(", "));
    dialog.selected.clear();
    record(def, dialog, step.key, value)
}

fn record(def: &SurveyDef, dialog: &mut SurveyDialog, key: &str, value: serde_json::Value) -> StepOutcome {
    dialog.answers.insert(key.to_string(), value);
    dialog.step += 1;
    if dialog.step >= def.steps.len() {
        StepOutcome::Complete
    } else {
        StepOutcome::Advance
    }
}

/// Text progress bar shown above each question, e.g. `[███░░░░░░░] 30%`.
pub fn progress_bar(step: usize, total: usize) -> String {
    if total == 0 {
        return String::new();
    }
    let done = step.min(total);
    let percent = done * 100 / total;
    let filled = done * 10 / total;
    let bar: String = "█".repeat(filled) + &"░".repeat(10 - filled);
    format!("[{bar}] {percent}%")
}

#[allow(clippy::expect_used)] // literal pattern, always compiles
static PHONE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").expect("valid literal regex"));

/// Validates and normalizes a free-text answer.
///
/// Returns the stored form of the value, or a user-facing re-prompt reason.
pub fn validate(validator: Validator, text: &str) -> Result<String, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("Ответ не может быть пустым.".to_string());
    }

    match validator {
        Validator::None => Ok(text.to_string()),
        Validator::FullName => {
            let words = text.split_whitespace().count();
            if words >= config::validation::MIN_NAME_WORDS {
                Ok(text.to_string())
            } else {
                Err("Пожалуйста, укажите фамилию и имя полностью.".to_string())
            }
        }
        Validator::Age => match text.parse::<u32>() {
            Ok(age) if (config::validation::MIN_AGE..=config::validation::MAX_AGE).contains(&age) => {
                Ok(age.to_string())
            }
            _ => Err(format!(
                "Укажите возраст числом от {} до {}.",
                config::validation::MIN_AGE,
                config::validation::MAX_AGE
            )),
        },
        Validator::Phone => normalize_phone(text)
            .ok_or_else(|| "Укажите номер телефона в формате +7XXXXXXXXXX или 8XXXXXXXXXX.".to_string()),
        Validator::MinLen(min) => {
            if text.chars().count() >= min {
                Ok(text.to_string())
            } else {
                Err(format!("Пожалуйста, ответьте подробнее (не менее {min} символов)."))
            }
        }
    }
}

/// Normalizes Russian phone numbers to `+7` + 10 digits.
fn normalize_phone(raw: &str) -> Option<String> {
    let digits = PHONE_DIGITS.replace_all(raw, "");
    let digits = digits.as_ref();

    let national = match digits.len() {
        11 if digits.starts_with('8') || digits.starts_with('7') => &digits[1..],
        10 => digits,
        _ => return None,
    };

    Some(format!("+7{national}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn recruitment_dialog() -> SurveyDialog {
        SurveyDialog::new(SurveyKind::Recruitment, Some("tve".to_string()))
    }

    #[test]
    fn test_phone_normalization() {
        assert_eq!(normalize_phone("8 (926) 123-45-67"), Some("+79261234567".to_string()));
        assert_eq!(normalize_phone("+7 926 123 45 67"), Some("+79261234567".to_string()));
        assert_eq!(normalize_phone("9261234567"), Some("+79261234567".to_string()));
        assert_eq!(normalize_phone("12345"), None);
        assert_eq!(normalize_phone("не скажу"), None);
    }

    #[test]
    fn test_full_name_needs_two_words() {
        assert!(validate(Validator::FullName, "Иванов Иван").is_ok());
        assert!(validate(Validator::FullName, "Иванов").is_err());
    }

    #[test]
    fn test_age_bounds() {
        assert!(validate(Validator::Age, "16").is_ok());
        assert!(validate(Validator::Age, "100").is_ok());
        assert!(validate(Validator::Age, "15").is_err());
        assert!(validate(Validator::Age, "сто").is_err());
    }

    #[test]
    fn test_min_len_counts_chars_not_bytes() {
        // 10 Cyrillic characters are 20 bytes
        assert!(validate(Validator::MinLen(10), "десятьбукв").is_ok());
        assert!(validate(Validator::MinLen(10), "мало").is_err());
    }

    #[test]
    fn test_text_answer_advances_and_stores() {
        let def = survey_def(SurveyKind::Recruitment);
        let mut dialog = recruitment_dialog();

        let outcome = answer_text(def, &mut dialog, "Иванов Иван");
        assert_eq!(outcome, StepOutcome::Advance);
        assert_eq!(dialog.step, 1);
        assert_eq!(dialog.answers["full_name"], serde_json::json!("Иванов Иван"));
    }

    #[test]
    fn test_invalid_text_reprompts_without_advancing() {
        let def = survey_def(SurveyKind::Recruitment);
        let mut dialog = recruitment_dialog();

        let outcome = answer_text(def, &mut dialog, "Иванов");
        assert!(matches!(outcome, StepOutcome::Reprompt(_)));
        assert_eq!(dialog.step, 0);
        assert!(dialog.answers.is_empty());
    }

    #[test]
    fn test_typed_text_on_keyboard_step_reprompts() {
        let def = survey_def(SurveyKind::Onboarding);
        let mut dialog = SurveyDialog::new(SurveyKind::Onboarding, None);

        // First onboarding step is a keyboard choice
        let outcome = answer_text(def, &mut dialog, "Отлично");
        assert!(matches!(outcome, StepOutcome::Reprompt(_)));
    }

    #[test]
    fn test_survey_runs_to_completion() {
        let def = survey_def(SurveyKind::CandidateFeedback);
        let mut dialog = SurveyDialog::new(SurveyKind::CandidateFeedback, None);

        let mut last = StepOutcome::Advance;
        for step in def.steps {
            last = match step.input {
                StepInput::Text(_) => answer_text(def, &mut dialog, "вполне нормальный развёрнутый ответ"),
                StepInput::Choice(_) => answer_choice(def, &mut dialog, 0),
                StepInput::MultiChoice(_) => {
                    toggle_multi_choice(def, &mut dialog, 0);
                    finish_multi_choice(def, &mut dialog)
                }
            };
        }
        assert_eq!(last, StepOutcome::Complete);
        assert_eq!(dialog.answers.len(), def.steps.len());
    }

    #[test]
    fn test_multi_choice_toggle_and_done() {
        let def = survey_def(SurveyKind::Recruitment);
        let mut dialog = recruitment_dialog();
        // Fast-forward to the multi-choice step (the last one)
        dialog.step = def.steps.len() - 1;

        toggle_multi_choice(def, &mut dialog, 0);
        toggle_multi_choice(def, &mut dialog, 2);
        toggle_multi_choice(def, &mut dialog, 0); // deselect
        assert_eq!(dialog.selected.len(), 1);

        let outcome = finish_multi_choice(def, &mut dialog);
        assert_eq!(outcome, StepOutcome::Complete);
        assert!(dialog.selected.is_empty());
    }

    #[test]
    fn test_empty_multi_choice_rejected() {
        let def = survey_def(SurveyKind::Recruitment);
        let mut dialog = recruitment_dialog();
        dialog.step = def.steps.len() - 1;

        let outcome = finish_multi_choice(def, &mut dialog);
        assert!(matches!(outcome, StepOutcome::Reprompt(_)));
    }

    #[test]
    fn test_progress_bar_rendering() {
        assert_eq!(progress_bar(0, 10), "[░░░░░░░░░░] 0%");
        assert_eq!(progress_bar(5, 10), "[█████░░░░░] 50%");
        assert_eq!(progress_bar(10, 10), "[██████████] 100%");
    }
}
