//! Telegram surface: bot setup, dispatcher schema, flows and keyboards.

pub mod bot;
pub mod handlers;
pub mod keyboards;
pub mod notifications;
pub mod state;
pub mod survey_defs;
pub mod surveys;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::schema::schema;
pub use handlers::{HandlerDeps, HandlerError};
