//! Lifecycle orchestration - the only writer of the plugin registry

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::application::errors::{LifecycleError, LoadError};
use crate::application::events::{lifecycle_event, EventLog, HostEvent};
use crate::application::services::CommandAggregator;
use crate::domain::entities::{BotCommand, CommandScope};
use crate::infrastructure::plugins::registry::PluginRegistry;

use super::handle::PluginHandle;
use super::record::{BundleLocation, PluginRecord};

/// File inside a plugin's data directory declaring bot commands, one
/// `name - description` per line.
pub const COMMANDS_FILE: &str = "commands.txt";

/// Turns bundle locations into wired plugin records. The dylib loader is the
/// production implementation; tests substitute their own. A loader never
/// touches the registry.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Load, validate and wire a bundle into a (record, handle) pair.
    async fn load(
        &self,
        location: &BundleLocation,
    ) -> Result<(Arc<PluginRecord>, PluginHandle), LoadError>;

    /// Names of bundles that could be enabled right now.
    async fn available(&self) -> Vec<String>;

    /// Resolve an operator-typed name to a bundle location.
    async fn resolve(&self, name: &str) -> Option<BundleLocation>;
}

/// Orchestrates enable/disable/reload against the registry and loader.
///
/// Every mutation is serialized through `op_lock`, so a plugin record is
/// never touched by two lifecycle operations at once and readers always see
/// either the pre- or post-operation registry.
pub struct LifecycleManager {
    registry: Arc<PluginRegistry>,
    loader: Arc<dyn Loader>,
    commands: Arc<CommandAggregator>,
    events: Arc<EventLog>,
    op_lock: Mutex<()>,
}

impl LifecycleManager {
    pub fn new(
        registry: Arc<PluginRegistry>,
        loader: Arc<dyn Loader>,
        commands: Arc<CommandAggregator>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            registry,
            loader,
            commands,
            events,
            op_lock: Mutex::new(()),
        }
    }

    /// Load, initialize and register the bundle at `location`. Returns the
    /// enabled plugin's name. Refuses to replace an already-enabled plugin.
    pub async fn enable(&self, location: &BundleLocation) -> Result<String, LifecycleError> {
        let _guard = self.op_lock.lock().await;
        self.enable_locked(location).await
    }

    async fn enable_locked(&self, location: &BundleLocation) -> Result<String, LifecycleError> {
        let (record, handle) = self.loader.load(location).await?;
        let name = record.name().to_string();

        if self.registry.contains(&name) {
            record.context().shutdown().await;
            return Err(LifecycleError::AlreadyEnabled(name));
        }

        let instance = record.instance();
        let init = record
            .context()
            .run(async move { instance.init(handle).await })
            .await;
        match init {
            Ok(Ok(())) => {}
            Ok(Err(e)) | Err(e) => {
                record.context().shutdown().await;
                return Err(LifecycleError::Init {
                    plugin: name,
                    source: e,
                });
            }
        }

        self.declare_file_commands(&record);
        self.registry
            .insert(record)
            .map_err(LifecycleError::Internal)?;
        info!(plugin = %name, source = %location, "plugin enabled");
        self.commands.sync().await;
        Ok(name)
    }

    /// Remove the plugin from the registry, run its `close` hook and tear
    /// down its execution context. Teardown is unconditional; a failing
    /// `close` is logged and does not fail the disable.
    pub async fn disable(&self, name: &str) -> Result<String, LifecycleError> {
        let _guard = self.op_lock.lock().await;
        self.disable_locked(name).await
    }

    async fn disable_locked(&self, name: &str) -> Result<String, LifecycleError> {
        // Removed first so new dispatches never see the plugin.
        let record = self
            .registry
            .remove(name)
            .ok_or_else(|| LifecycleError::NotEnabled(name.to_string()))?;

        let instance = record.instance();
        let close = record
            .context()
            .run(async move { instance.close().await })
            .await;
        match close {
            Ok(Ok(())) => {}
            Ok(Err(e)) | Err(e) => self.events.log(&HostEvent::CloseError {
                plugin: name.to_string(),
                reason: e.to_string(),
            }),
        }

        record.context().shutdown().await;
        info!(plugin = %name, "plugin disabled");
        self.commands.sync().await;
        Ok(name.to_string())
    }

    /// Disable then re-enable from the remembered source. If the disable
    /// fails nothing is attempted; if the re-enable fails the name ends up
    /// absent, never half-enabled.
    pub async fn reload(&self, name: &str) -> Result<String, LifecycleError> {
        let _guard = self.op_lock.lock().await;
        let record = self
            .registry
            .get(name)
            .ok_or_else(|| LifecycleError::NotEnabled(name.to_string()))?;
        let source = record.source().clone();
        drop(record);
        self.disable_locked(name).await?;
        self.enable_locked(&source).await
    }

    /// Enable each location independently, continuing past failures.
    /// Returns the names that were actually enabled.
    pub async fn enable_all(&self, locations: Vec<BundleLocation>) -> Vec<String> {
        let mut enabled = Vec::new();
        for location in locations {
            match self.enable(&location).await {
                Ok(name) => enabled.push(name),
                Err(e) => self.events.log(&lifecycle_event(&e)),
            }
        }
        enabled
    }

    /// Disable each plugin independently, continuing past failures.
    pub async fn disable_all(&self, names: Vec<String>) -> Vec<String> {
        let mut disabled = Vec::new();
        for name in names {
            match self.disable(&name).await {
                Ok(name) => disabled.push(name),
                Err(e) => self.events.log(&lifecycle_event(&e)),
            }
        }
        disabled
    }

    /// Reload each plugin independently, continuing past failures.
    pub async fn reload_all(&self, names: Vec<String>) -> Vec<String> {
        let mut reloaded = Vec::new();
        for name in names {
            match self.reload(&name).await {
                Ok(name) => reloaded.push(name),
                Err(e) => self.events.log(&lifecycle_event(&e)),
            }
        }
        reloaded
    }

    /// Disable every enabled plugin; used at host shutdown.
    pub async fn shutdown(&self) {
        let names = self.registry.names();
        self.disable_all(names).await;
    }

    /// Bot commands may also be declared through a `commands.txt` in the
    /// plugin's data directory. A malformed file is reported and skipped;
    /// it never fails the enable.
    fn declare_file_commands(&self, record: &PluginRecord) {
        let path = record.data_path().join(COMMANDS_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => return,
        };
        match parse_commands_file(&content) {
            Ok(commands) => {
                debug!(plugin = record.name(), count = commands.len(), "declared commands from file");
                for (name, description) in commands {
                    record.registrations().declare_bot_command(
                        CommandScope::Default,
                        None,
                        BotCommand::new(name, description),
                    );
                }
            }
            Err(reason) => {
                warn!(plugin = record.name(), %reason, "ignoring malformed commands file");
            }
        }
    }
}

/// Parse `name - description` lines; empty lines are skipped.
fn parse_commands_file(content: &str) -> Result<Vec<(String, String)>, String> {
    let mut commands = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (name, description) = line
            .split_once('-')
            .ok_or_else(|| format!("missing '-' separator in '{line}'"))?;
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("invalid command name '{name}'"));
        }
        commands.push((name.to_string(), description.trim().to_string()));
    }
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::parse_commands_file;

    #[test]
    fn parses_name_description_lines() {
        let parsed = parse_commands_file("ping - check liveness\n\nhelp - show help\n")
            .expect("valid file");
        assert_eq!(
            parsed,
            vec![
                ("ping".to_string(), "check liveness".to_string()),
                ("help".to_string(), "show help".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(parse_commands_file("ping check liveness").is_err());
    }

    #[test]
    fn rejects_invalid_command_name() {
        assert!(parse_commands_file("pi ng - nope").is_err());
    }
}
