//! SQLite-backed durable state: tasks, employees, surveys, outbox, dialogs

pub mod db;
pub mod dialogs;
pub mod employees;
pub mod feedback;
pub mod managers;
pub mod migrations;
pub mod outbox;
pub mod surveys;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool};
