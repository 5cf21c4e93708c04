//! Host-facing API surface handed to plugins

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use libloading::Library;
use tokio::sync::mpsc;
use tracing::Level;

use crate::application::events::EventLog;
use crate::application::services::CommandAggregator;
use crate::domain::entities::{BotCommand, CommandScope};
use crate::domain::traits::PlatformClient;

use super::api::{CommandSpec, Plugin, PluginResult, UpdateHandler};
use super::context::TaskGroup;
use super::record::{BundleLocation, PluginRecord, Registrations, DATA_DIR};

/// Capabilities the host grants a plugin: registration, private storage,
/// supervised spawning, platform access and logging under its own category.
///
/// Handed to `init`; plugins may clone and keep it.
#[derive(Clone)]
pub struct PluginHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    name: String,
    data_root: PathBuf,
    registrations: Arc<Registrations>,
    tasks: TaskGroup,
    events: Arc<EventLog>,
    platform: Arc<dyn PlatformClient>,
    commands_sync: Arc<CommandAggregator>,
    console_tx: mpsc::Sender<String>,
}

impl PluginHandle {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The plugin's private storage directory, created on first use and
    /// never shared with other plugins.
    pub fn data_dir(&self) -> io::Result<PathBuf> {
        let dir = self.inner.data_root.join(DATA_DIR);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Shared chat platform client.
    pub fn platform(&self) -> Arc<dyn PlatformClient> {
        self.inner.platform.clone()
    }

    pub fn register_update_handler(&self, handler: impl UpdateHandler + 'static) {
        self.inner.registrations.add_update_handler(Arc::new(handler));
    }

    pub fn register_backlog_handler(&self, handler: impl UpdateHandler + 'static) {
        self.inner.registrations.add_backlog_handler(Arc::new(handler));
    }

    pub fn register_command(&self, spec: CommandSpec) {
        self.inner.registrations.add_command(spec);
    }

    pub fn unregister_command(&self, name: &str) {
        self.inner.registrations.remove_command(name);
    }

    /// Advertise a command to platform users under the given scope/locale.
    /// Takes effect at the next metadata refresh.
    pub fn declare_bot_command(
        &self,
        scope: CommandScope,
        locale: Option<&str>,
        command: impl Into<String>,
        description: impl Into<String>,
    ) {
        self.inner.registrations.declare_bot_command(
            scope,
            locale,
            BotCommand::new(command, description),
        );
    }

    pub fn undeclare_bot_command(
        &self,
        scope: &CommandScope,
        locale: Option<&str>,
        command: &str,
    ) {
        self.inner
            .registrations
            .undeclare_bot_command(scope, locale, command);
    }

    /// Ask the host to re-aggregate and push all declared bot commands.
    pub fn request_command_refresh(&self) {
        let sync = self.inner.commands_sync.clone();
        self.inner.tasks.spawn(async move {
            sync.sync().await;
            Ok(())
        });
    }

    /// Spawn background work into the plugin's supervised context.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = PluginResult<()>> + Send + 'static,
    {
        self.inner.tasks.spawn(future);
    }

    /// Spawn a task that runs `task` every `period` until the plugin is
    /// disabled or the task fails.
    pub fn spawn_repeating<F, Fut>(&self, period: Duration, task: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PluginResult<()>> + Send + 'static,
    {
        self.inner.tasks.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                task().await?;
            }
        });
    }

    /// Feed a line into the operator console queue, as if typed.
    pub async fn dispatch_console_command(&self, line: impl Into<String>) -> bool {
        self.inner.console_tx.send(line.into()).await.is_ok()
    }

    pub fn info(&self, message: &str) {
        self.inner.events.raw(Level::INFO, &self.inner.name, message);
    }

    pub fn warn(&self, message: &str) {
        self.inner.events.raw(Level::WARN, &self.inner.name, message);
    }

    pub fn error(&self, message: &str) {
        self.inner.events.raw(Level::ERROR, &self.inner.name, message);
    }
}

/// Shared services every loader wires new plugins with.
#[derive(Clone)]
pub struct HostServices {
    pub events: Arc<EventLog>,
    pub platform: Arc<dyn PlatformClient>,
    pub commands_sync: Arc<CommandAggregator>,
    pub console_tx: mpsc::Sender<String>,
}

impl HostServices {
    /// Wire an instantiated plugin with its name, data root, an empty
    /// registration set and a fresh execution context.
    pub fn wire(
        &self,
        name: &str,
        source: BundleLocation,
        data_root: PathBuf,
        instance: Arc<dyn Plugin>,
        library: Option<Library>,
    ) -> (Arc<PluginRecord>, PluginHandle) {
        let context = TaskGroup::new(name, self.events.clone());
        let registrations = Arc::new(Registrations::default());
        let record = Arc::new(PluginRecord::new(
            name.to_string(),
            source,
            data_root.clone(),
            instance,
            registrations.clone(),
            context.clone(),
            library,
        ));
        let handle = PluginHandle {
            inner: Arc::new(HandleInner {
                name: name.to_string(),
                data_root,
                registrations,
                tasks: context,
                events: self.events.clone(),
                platform: self.platform.clone(),
                commands_sync: self.commands_sync.clone(),
                console_tx: self.console_tx.clone(),
            }),
        };
        (record, handle)
    }
}
