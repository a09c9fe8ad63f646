//! HR bot for a restaurant chain: candidate questionnaires, manager
//! decisions, onboarding and exit surveys, with a durable spreadsheet
//! outbox and liveness signals for an external watchdog.

pub mod core;
pub mod sheets;
pub mod storage;
pub mod telegram;
