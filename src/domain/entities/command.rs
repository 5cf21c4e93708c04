use serde::{Deserialize, Serialize};

/// A command a plugin advertises to the platform so users can discover it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

impl BotCommand {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}

/// Audience a declared command list applies to, mirroring the platform's
/// command scope object on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandScope {
    Default,
    AllPrivateChats,
    AllGroupChats,
    Chat { chat_id: i64 },
}

impl Default for CommandScope {
    fn default() -> Self {
        Self::Default
    }
}

/// Grouping key for declared command lists: one outward push per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandKey {
    pub scope: CommandScope,
    pub locale: Option<String>,
}

impl CommandKey {
    pub fn new(scope: CommandScope, locale: Option<&str>) -> Self {
        Self {
            scope,
            locale: locale.map(|l| l.to_string()),
        }
    }
}
