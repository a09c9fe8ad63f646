//! Integration tests for persisted dialog state.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use kadrovik::storage::{create_pool, get_connection, DbPool};
use kadrovik::telegram::state::{
    DecisionDialog, DecisionStage, DialogState, DialogStore, ManagerRegStep, SurveyDialog, SurveyKind,
};

fn test_pool(dir: &tempfile::TempDir) -> Arc<DbPool> {
    let path = dir.path().join("test.sqlite");
    Arc::new(create_pool(path.to_str().expect("utf-8 path")).expect("create pool"))
}

mod dialog_store_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_survey_resumes_across_restart() {
        let dir = tempfile::tempdir().expect("tempdir");

        let mut dialog = SurveyDialog::new(SurveyKind::Recruitment, Some("arb".to_string()));
        dialog.step = 5;
        dialog
            .answers
            .insert("full_name".to_string(), serde_json::json!("Сидорова Анна"));
        dialog.answers.insert("age".to_string(), serde_json::json!("24"));

        {
            let store = DialogStore::new(test_pool(&dir));
            store.save(100, &DialogState::Survey(dialog.clone())).expect("save");
        }

        // A fresh store over the same database stands in for a restart.
        let store = DialogStore::new(test_pool(&dir));
        let restored = store.load(100).expect("load").expect("state present");
        assert_eq!(restored, DialogState::Survey(dialog));
    }

    #[tokio::test]
    async fn test_states_are_isolated_per_chat() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DialogStore::new(test_pool(&dir));

        store
            .save(
                1,
                &DialogState::ManagerRegistration {
                    step: ManagerRegStep::FullName {
                        restaurant_code: "tve".to_string(),
                    },
                },
            )
            .expect("save");
        store
            .save(
                2,
                &DialogState::ManagerDecision(DecisionDialog {
                    feedback_id: "fid-1".to_string(),
                    candidate_id: 77,
                    candidate_name: "Иванов Иван".to_string(),
                    stage: DecisionStage::ShiftTime {
                        shift_date: "01.09.2026".to_string(),
                    },
                }),
            )
            .expect("save");

        assert!(matches!(
            store.load(1).expect("load"),
            Some(DialogState::ManagerRegistration { .. })
        ));
        assert!(matches!(
            store.load(2).expect("load"),
            Some(DialogState::ManagerDecision(_))
        ));
        assert_eq!(store.load(3).expect("load"), None);
    }

    #[tokio::test]
    async fn test_save_replaces_previous_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DialogStore::new(test_pool(&dir));

        store
            .save(5, &DialogState::Survey(SurveyDialog::new(SurveyKind::Climate, None)))
            .expect("save");
        store.save(5, &DialogState::BotFeedback).expect("save");

        assert_eq!(store.load(5).expect("load"), Some(DialogState::BotFeedback));
    }

    #[tokio::test]
    async fn test_clear_removes_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DialogStore::new(test_pool(&dir));

        store
            .save(
                9,
                &DialogState::NoShowReason {
                    restaurant_code: "sit".to_string(),
                },
            )
            .expect("save");
        store.clear(9).expect("clear");

        assert_eq!(store.load(9).expect("load"), None);
        // Clearing an absent state is a no-op, not an error.
        store.clear(9).expect("clear again");
    }

    #[tokio::test]
    async fn test_undecodable_state_is_dropped_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir);
        let store = DialogStore::new(Arc::clone(&pool));

        // Simulates state written by an older build with a variant this one
        // does not know.
        {
            let conn = get_connection(&pool).expect("conn");
            conn.execute(
                "INSERT INTO dialogs (chat_id, state_json, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![42, r#"{"type":"retired_flow","step":1}"#, "2026-01-01T00:00:00Z"],
            )
            .expect("insert");
        }

        assert_eq!(store.load(42).expect("load"), None);
        // The broken row is gone, so the chat is usable again.
        let conn = get_connection(&pool).expect("conn");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM dialogs WHERE chat_id = 42", [], |r| r.get(0))
            .expect("count");
        assert_eq!(count, 0);
    }
}
