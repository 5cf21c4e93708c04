//! Runtime record of a loaded plugin

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use libloading::Library;
use url::Url;

use crate::domain::entities::{BotCommand, CommandKey, CommandScope};

use super::api::{CommandHandler, CommandSpec, Plugin, UpdateHandler};
use super::context::TaskGroup;

/// Subdirectory of the bundle root holding a plugin's private state.
pub(crate) const DATA_DIR: &str = "data";

/// Where a plugin bundle came from; remembered so `reload` can repeat the
/// load from the same source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleLocation {
    Path(PathBuf),
    Url(Url),
}

impl fmt::Display for BundleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleLocation::Path(path) => write!(f, "{}", path.display()),
            BundleLocation::Url(url) => write!(f, "{url}"),
        }
    }
}

/// A registered console command with its help metadata.
#[derive(Clone)]
pub struct RegisteredCommand {
    pub name: String,
    pub description: Option<String>,
    pub usage: Option<String>,
    pub handler: Arc<dyn CommandHandler>,
}

/// Everything a plugin registered while initializing. Shared between the
/// plugin's handle and its registry record.
#[derive(Default)]
pub struct Registrations {
    update_handlers: RwLock<Vec<Arc<dyn UpdateHandler>>>,
    backlog_handlers: RwLock<Vec<Arc<dyn UpdateHandler>>>,
    commands: RwLock<Vec<RegisteredCommand>>,
    bot_commands: RwLock<HashMap<CommandKey, Vec<BotCommand>>>,
}

impl Registrations {
    pub fn add_update_handler(&self, handler: Arc<dyn UpdateHandler>) {
        if let Ok(mut handlers) = self.update_handlers.write() {
            handlers.push(handler);
        }
    }

    pub fn add_backlog_handler(&self, handler: Arc<dyn UpdateHandler>) {
        if let Ok(mut handlers) = self.backlog_handlers.write() {
            handlers.push(handler);
        }
    }

    /// Snapshot of the live-update handlers in registration order.
    pub fn update_handlers(&self) -> Vec<Arc<dyn UpdateHandler>> {
        self.update_handlers
            .read()
            .map(|handlers| handlers.clone())
            .unwrap_or_default()
    }

    /// Snapshot of the backlog handlers in registration order.
    pub fn backlog_handlers(&self) -> Vec<Arc<dyn UpdateHandler>> {
        self.backlog_handlers
            .read()
            .map(|handlers| handlers.clone())
            .unwrap_or_default()
    }

    /// Register a console command; re-registering a name replaces it.
    pub fn add_command(&self, spec: CommandSpec) {
        if let Ok(mut commands) = self.commands.write() {
            commands.retain(|c| c.name != spec.name);
            commands.push(RegisteredCommand {
                name: spec.name,
                description: spec.description,
                usage: spec.usage,
                handler: spec.handler,
            });
        }
    }

    pub fn remove_command(&self, name: &str) {
        if let Ok(mut commands) = self.commands.write() {
            commands.retain(|c| c.name != name);
        }
    }

    pub fn command(&self, name: &str) -> Option<RegisteredCommand> {
        self.commands
            .read()
            .ok()?
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    pub fn commands(&self) -> Vec<RegisteredCommand> {
        self.commands
            .read()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }

    pub fn declare_bot_command(
        &self,
        scope: CommandScope,
        locale: Option<&str>,
        command: BotCommand,
    ) {
        if let Ok(mut declared) = self.bot_commands.write() {
            declared
                .entry(CommandKey::new(scope, locale))
                .or_default()
                .push(command);
        }
    }

    pub fn undeclare_bot_command(&self, scope: &CommandScope, locale: Option<&str>, name: &str) {
        if let Ok(mut declared) = self.bot_commands.write() {
            let key = CommandKey::new(scope.clone(), locale);
            if let Some(commands) = declared.get_mut(&key) {
                commands.retain(|c| c.command != name);
                if commands.is_empty() {
                    declared.remove(&key);
                }
            }
        }
    }

    /// Snapshot of all declared bot commands, grouped by (scope, locale).
    pub fn bot_commands(&self) -> HashMap<CommandKey, Vec<BotCommand>> {
        self.bot_commands
            .read()
            .map(|declared| declared.clone())
            .unwrap_or_default()
    }
}

/// A loaded plugin: instance, registrations and execution context, plus the
/// shared library kept mapped for as long as the instance lives.
pub struct PluginRecord {
    name: String,
    source: BundleLocation,
    data_root: PathBuf,
    instance: Arc<dyn Plugin>,
    registrations: Arc<Registrations>,
    context: TaskGroup,
    // Declared after `instance` so the library is unmapped only once the
    // instance is gone.
    _library: Option<Library>,
}

impl PluginRecord {
    pub fn new(
        name: String,
        source: BundleLocation,
        data_root: PathBuf,
        instance: Arc<dyn Plugin>,
        registrations: Arc<Registrations>,
        context: TaskGroup,
        library: Option<Library>,
    ) -> Self {
        Self {
            name,
            source,
            data_root,
            instance,
            registrations,
            context,
            _library: library,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &BundleLocation {
        &self.source
    }

    pub fn instance(&self) -> Arc<dyn Plugin> {
        self.instance.clone()
    }

    pub fn registrations(&self) -> &Registrations {
        &self.registrations
    }

    pub fn context(&self) -> &TaskGroup {
        &self.context
    }

    /// Private storage root; never created implicitly here.
    pub fn data_path(&self) -> PathBuf {
        self.data_root.join(DATA_DIR)
    }

    /// Private storage root, created on first use.
    pub fn data_dir(&self) -> io::Result<PathBuf> {
        let dir = self.data_path();
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn bundle_root(&self) -> &Path {
        &self.data_root
    }
}
