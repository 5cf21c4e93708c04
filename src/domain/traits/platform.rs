use std::time::Duration;

use async_trait::async_trait;

use crate::application::errors::PlatformError;
use crate::domain::entities::{BotCommand, CommandScope, Update};

/// Abstraction over the chat platform wire client.
///
/// The update poller consumes events from it, plugins send messages through
/// it, and the command-metadata aggregator pushes merged command lists to it.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Send a text message to a chat.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), PlatformError>;

    /// Long-poll for updates newer than `offset`. A zero timeout returns
    /// whatever is already queued.
    async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>, PlatformError>;

    /// Replace the advertised command list for one (scope, locale) group.
    async fn set_commands(
        &self,
        scope: &CommandScope,
        locale: Option<&str>,
        commands: &[BotCommand],
    ) -> Result<(), PlatformError>;
}
