//! Telegram update handlers, grouped by flow.

pub mod admin;
pub mod decision;
pub mod followup;
pub mod manager;
pub mod schema;
pub mod start;
pub mod survey_flow;
pub mod types;

pub use types::{HandlerDeps, HandlerError};
