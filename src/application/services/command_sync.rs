//! Command-metadata aggregator
//!
//! Collects every enabled plugin's declared bot commands and pushes the
//! merged lists to the platform after each registry mutation (or when a
//! plugin asks for a refresh).

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::application::events::{EventLog, HostEvent};
use crate::domain::entities::{BotCommand, CommandKey, CommandScope};
use crate::domain::traits::PlatformClient;
use crate::infrastructure::plugins::registry::PluginRegistry;

pub struct CommandAggregator {
    registry: Arc<PluginRegistry>,
    platform: Arc<dyn PlatformClient>,
    events: Arc<EventLog>,
}

impl CommandAggregator {
    pub fn new(
        registry: Arc<PluginRegistry>,
        platform: Arc<dyn PlatformClient>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            registry,
            platform,
            events,
        }
    }

    /// Group every enabled plugin's declarations by (scope, locale) and push
    /// each group outward. A failed push is logged as a sync error and never
    /// rolls back the registry mutation that triggered it.
    pub async fn sync(&self) {
        for (key, commands) in self.collect() {
            debug!(scope = ?key.scope, locale = ?key.locale, count = commands.len(), "pushing command metadata");
            if let Err(e) = self
                .platform
                .set_commands(&key.scope, key.locale.as_deref(), &commands)
                .await
            {
                self.events.log(&HostEvent::MetadataSyncError {
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Per-plugin lists are concatenated in registry snapshot order. The
    /// default group is always present so disabling the last declaring
    /// plugin clears the outward list.
    fn collect(&self) -> BTreeMap<CommandKey, Vec<BotCommand>> {
        let mut groups: BTreeMap<CommandKey, Vec<BotCommand>> = BTreeMap::new();
        groups
            .entry(CommandKey::new(CommandScope::Default, None))
            .or_default();
        for record in self.registry.snapshot() {
            for (key, commands) in record.registrations().bot_commands() {
                groups.entry(key).or_default().extend(commands);
            }
        }
        groups
    }
}
