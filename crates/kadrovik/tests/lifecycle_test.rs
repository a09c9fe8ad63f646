//! Integration tests for the candidate/manager lifecycle in storage.

use pretty_assertions::assert_eq;
use serde_json::json;

use kadrovik::storage::{create_pool, employees, feedback, get_connection, managers, surveys, DbPool};

fn test_pool(dir: &tempfile::TempDir) -> DbPool {
    let path = dir.path().join("test.sqlite");
    create_pool(path.to_str().expect("utf-8 path")).expect("create pool")
}

mod feedback_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decision_moves_all_candidate_tasks_to_history() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir);
        let conn = get_connection(&pool).expect("conn");

        let job_data = json!({"full_name": "Иванов Иван"}).to_string();
        // The same candidate fans out to two managers.
        feedback::create_pending_feedback(&conn, "fid-a", 10, 500, 77, "Иванов Иван", &job_data).expect("create");
        feedback::create_pending_feedback(&conn, "fid-b", 11, 501, 77, "Иванов Иван", &job_data).expect("create");

        let moved = feedback::move_to_history(&conn, 77, 10, "invited").expect("move");
        assert_eq!(moved.len(), 2);

        // Both tasks are closed; the second decision attempt finds nothing.
        assert!(feedback::get_pending_feedback(&conn, "fid-a").expect("get").is_none());
        assert!(feedback::get_pending_feedback(&conn, "fid-b").expect("get").is_none());
        let moved_again = feedback::move_to_history(&conn, 77, 11, "refused").expect("move");
        assert!(moved_again.is_empty());

        // History counts candidates, not task copies.
        let counts = feedback::history_count_by_status(&conn).expect("counts");
        assert_eq!(counts, vec![("invited".to_string(), 1)]);
    }

    #[test]
    fn test_pending_for_manager_only_lists_own_tasks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir);
        let conn = get_connection(&pool).expect("conn");

        feedback::create_pending_feedback(&conn, "fid-1", 10, 1, 70, "А", "{}").expect("create");
        feedback::create_pending_feedback(&conn, "fid-2", 10, 2, 71, "Б", "{}").expect("create");
        feedback::create_pending_feedback(&conn, "fid-3", 11, 3, 70, "А", "{}").expect("create");

        let tasks = feedback::pending_for_manager(&conn, 10).expect("list");
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.manager_id == 10));
    }

    #[test]
    fn test_delete_user_data_wipes_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir);
        let conn = get_connection(&pool).expect("conn");

        employees::upsert_employee(&conn, 77, "tve", "Иванов Иван", "повар", false).expect("upsert");
        feedback::create_pending_feedback(&conn, "fid-x", 10, 1, 77, "Иванов Иван", "{}").expect("create");
        surveys::mark_survey_completed(&conn, "recruitment", 77).expect("mark");

        feedback::delete_user_data(&conn, 77).expect("delete");

        assert!(employees::restaurant_for_user(&conn, 77).expect("get").is_none());
        assert!(feedback::get_pending_feedback(&conn, "fid-x").expect("get").is_none());
        assert!(surveys::survey_completed_at(&conn, "recruitment", 77).expect("get").is_none());
    }
}

mod manager_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pending_request_is_taken_exactly_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir);
        let conn = get_connection(&pool).expect("conn");

        managers::add_pending_manager(&conn, 55, "arb", "Петрова Мария").expect("add");

        let first = managers::take_pending_manager(&conn, 55).expect("take");
        assert_eq!(first.expect("present").full_name, "Петрова Мария");

        // A second admin pressing the same button gets nothing.
        assert!(managers::take_pending_manager(&conn, 55).expect("take").is_none());
    }

    #[test]
    fn test_repeated_request_replaces_previous_one() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir);
        let conn = get_connection(&pool).expect("conn");

        managers::add_pending_manager(&conn, 55, "arb", "Петрова Мария").expect("add");
        managers::add_pending_manager(&conn, 55, "tve", "Петрова Мария").expect("add");

        let pending = managers::list_pending_managers(&conn).expect("list");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].restaurant_code, "tve");
    }

    #[test]
    fn test_manager_fanout_is_scoped_to_restaurant() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir);
        let conn = get_connection(&pool).expect("conn");

        managers::add_manager(&conn, 10, "tve", "Смирнов Пётр").expect("add");
        managers::add_manager(&conn, 11, "tve", "Кузнецова Ольга").expect("add");
        managers::add_manager(&conn, 12, "arb", "Новиков Андрей").expect("add");

        let tve = managers::managers_for_restaurant(&conn, "tve").expect("list");
        assert_eq!(tve.len(), 2);
        assert!(tve.iter().all(|m| m.restaurant_code == "tve"));

        assert!(managers::is_manager(&conn, 12).expect("check"));
        assert!(managers::remove_manager(&conn, 12, "arb").expect("remove"));
        assert!(!managers::is_manager(&conn, 12).expect("check"));
    }
}

mod employee_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_candidate_activation_flow() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir);
        let conn = get_connection(&pool).expect("conn");

        // Interview registers the candidate inactive.
        employees::upsert_employee(&conn, 77, "sit", "Иванов Иван", "официант", false).expect("upsert");
        let row = employees::get_employee(&conn, 77, "sit").expect("get").expect("row");
        assert!(!row.is_active);
        assert!(employees::active_employee_ids(&conn).expect("ids").is_empty());

        // First shift confirmed: active, eligible for broadcasts.
        assert!(employees::set_employee_active(&conn, 77, true).expect("activate"));
        assert_eq!(employees::active_employee_ids(&conn).expect("ids"), vec![77]);

        let stats = employees::employee_stats(&conn).expect("stats");
        assert_eq!(stats, vec![("sit".to_string(), 1, 0)]);
    }

    #[test]
    fn test_pagination_covers_all_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir);
        let conn = get_connection(&pool).expect("conn");

        for i in 0..7 {
            employees::upsert_employee(&conn, 100 + i, "tve", &format!("Сотрудник {i}"), "", true).expect("upsert");
        }

        let (page0, total) = employees::list_employees_page(&conn, 0, 5).expect("page");
        let (page1, _) = employees::list_employees_page(&conn, 1, 5).expect("page");
        let (page2, _) = employees::list_employees_page(&conn, 2, 5).expect("page");

        assert_eq!(total, 7);
        assert_eq!(page0.len(), 5);
        assert_eq!(page1.len(), 2);
        assert!(page2.is_empty());
    }
}
