//! Bot initialization: command definitions and instance creation

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;

/// Slash commands the bot understands.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    /// Carries the deep-link payload, e.g. `/start interview_tve`.
    #[command(description = "начать работу с ботом")]
    Start(String),
    #[command(description = "прервать текущую анкету")]
    Cancel,
    #[command(description = "оставить отзыв о боте")]
    Feedback,
    #[command(rename = "register_manager", description = "регистрация менеджера ресторана")]
    RegisterManager,
    #[command(description = "панель администратора")]
    Admin,
}

/// Creates a Bot instance with a request timeout.
///
/// The token comes from BOT_TOKEN (or TELOXIDE_TOKEN as a fallback).
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN is not set");
    }

    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    Ok(Bot::with_client(config::BOT_TOKEN.clone(), client))
}

/// Registers the command list shown in the Telegram menu button.
/// /admin is left out on purpose.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "начать работу с ботом"),
        BotCommand::new("cancel", "прервать текущую анкету"),
        BotCommand::new("feedback", "оставить отзыв о боте"),
        BotCommand::new("register_manager", "регистрация менеджера ресторана"),
    ])
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_descriptions_present() {
        let commands = Command::descriptions();
        let command_list = format!("{}", commands);

        assert!(command_list.contains("Я умею"));
        assert!(command_list.contains("start"));
        assert!(command_list.contains("register_manager"));
    }
}
