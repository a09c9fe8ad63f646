//! Persisted per-chat dialog state.
//!
//! Every multi-step flow is an explicit `DialogState` variant stored as JSON
//! in the `dialogs` table, keyed by chat id. Handlers load the state on each
//! update, dispatch on the variant, and save the transition back, so any
//! dialog survives a process restart mid-flow.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};

use crate::core::error::AppResult;
use crate::storage::{dialogs, get_connection, DbPool};

/// Survey types runnable by the generic driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SurveyKind {
    Recruitment,
    Onboarding,
    ExitInterview,
    Climate,
    CandidateFeedback,
}

/// A survey in progress: current step plus collected answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyDialog {
    pub kind: SurveyKind,
    pub step: usize,
    pub answers: serde_json::Map<String, serde_json::Value>,
    /// Restaurant the survey belongs to (from the deep link, if any)
    pub restaurant_code: Option<String>,
    /// Accumulator for the current multi-choice step
    #[serde(default)]
    pub selected: Vec<String>,
}

impl SurveyDialog {
    pub fn new(kind: SurveyKind, restaurant_code: Option<String>) -> Self {
        Self {
            kind,
            step: 0,
            answers: serde_json::Map::new(),
            restaurant_code,
            selected: Vec::new(),
        }
    }
}

/// Manager self-registration: restaurant first, then full name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerRegStep {
    ChooseRestaurant,
    FullName { restaurant_code: String },
}

/// Stages of a manager's decision about a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStage {
    /// Invitation accepted, collecting the first shift date
    ShiftDate,
    /// Collecting the shift time
    ShiftTime { shift_date: String },
    /// Optional free-text comment
    Comment { shift_date: String, shift_time: String },
    /// Final rejection, collecting the reason
    RejectReason { status: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionDialog {
    pub feedback_id: String,
    pub candidate_id: i64,
    pub candidate_name: String,
    pub stage: DecisionStage,
}

/// All dialog states the bot can park a chat in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogState {
    Survey(SurveyDialog),
    ManagerRegistration { step: ManagerRegStep },
    ManagerDecision(DecisionDialog),
    /// Waiting for free-text feedback about the bot itself
    BotFeedback,
    /// Admin is typing the reason a manager request was rejected
    RejectPendingManager { pending_user_id: i64 },
    /// Candidate said they did not show up; waiting for the reason
    NoShowReason { restaurant_code: String },
}

/// Typed store over the `dialogs` table.
#[derive(Clone)]
pub struct DialogStore {
    db: Arc<DbPool>,
}

impl DialogStore {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub fn load(&self, chat_id: i64) -> AppResult<Option<DialogState>> {
        let conn = get_connection(&self.db)?;
        let Some(raw) = dialogs::load_dialog(&conn, chat_id)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                // A state this build cannot decode would wedge the chat.
                log::warn!("Dropping undecodable dialog state for chat {}: {}", chat_id, e);
                dialogs::clear_dialog(&conn, chat_id)?;
                Ok(None)
            }
        }
    }

    pub fn save(&self, chat_id: i64, state: &DialogState) -> AppResult<()> {
        let conn = get_connection(&self.db)?;
        dialogs::save_dialog(&conn, chat_id, &serde_json::to_string(state)?)
    }

    pub fn clear(&self, chat_id: i64) -> AppResult<()> {
        let conn = get_connection(&self.db)?;
        dialogs::clear_dialog(&conn, chat_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dialog_state_round_trips_through_json() {
        let mut dialog = SurveyDialog::new(SurveyKind::Recruitment, Some("tve".to_string()));
        dialog.step = 3;
        dialog
            .answers
            .insert("full_name".to_string(), serde_json::json!("Иванов Иван"));
        let state = DialogState::Survey(dialog);

        let raw = serde_json::to_string(&state).unwrap();
        let restored: DialogState = serde_json::from_str(&raw).unwrap();
        assert_eq!(state, restored);
    }

    #[test]
    fn test_survey_kind_string_form_is_stable() {
        assert_eq!(SurveyKind::ExitInterview.to_string(), "exit_interview");
        assert_eq!("climate".parse::<SurveyKind>().unwrap(), SurveyKind::Climate);
    }
}
