//! Structured events handed to the logging collaborator.
//!
//! Every operator-visible outcome and every swallowed plugin failure becomes
//! one `HostEvent`, rendered to a (level, category, message) triple and
//! fanned out to the configured sinks.

use std::sync::Arc;

use tracing::Level;

use crate::application::errors::LifecycleError;
use crate::domain::traits::LogSink;

/// Category used for events not attributable to a single plugin.
pub const HOST_CATEGORY: &str = "plugbot";

#[derive(Debug, Clone)]
pub enum HostEvent {
    BotStart { username: String },
    BotStop,
    StopRequested,
    PluginEnabled { plugin: String },
    PluginsEnabled { plugins: Vec<String> },
    PluginDisabled { plugin: String },
    PluginsDisabled { plugins: Vec<String> },
    PluginReloaded { plugin: String },
    PluginsReloaded { plugins: Vec<String> },
    ShowPlugins { enabled: Vec<String>, available: Vec<String> },
    AlreadyEnabled { plugin: String },
    NotEnabled { plugin: String },
    NotAvailable { name: String },
    LoadError { bundle: String, reason: String },
    InitError { plugin: String, reason: String },
    CloseError { plugin: String, reason: String },
    TaskError { plugin: String, reason: String },
    DispatchError { plugin: String, update_id: i64, reason: String },
    MetadataSyncError { reason: String },
    PollError { reason: String },
    UnknownCommand { name: String },
    CommandConflict { name: String, owners: Vec<String> },
    CommandFailed { name: String, reason: String },
    Usage { usage: &'static str },
    Help { lines: Vec<String> },
    HostError { reason: String },
}

impl HostEvent {
    pub fn level(&self) -> Level {
        match self {
            HostEvent::LoadError { .. }
            | HostEvent::InitError { .. }
            | HostEvent::CloseError { .. }
            | HostEvent::TaskError { .. }
            | HostEvent::DispatchError { .. }
            | HostEvent::MetadataSyncError { .. }
            | HostEvent::PollError { .. }
            | HostEvent::CommandFailed { .. }
            | HostEvent::HostError { .. } => Level::ERROR,
            HostEvent::CommandConflict { .. } => Level::WARN,
            _ => Level::INFO,
        }
    }

    /// Plugin-attributable events carry the plugin name as category so an
    /// operator can filter one plugin's noise.
    pub fn category(&self) -> &str {
        match self {
            HostEvent::InitError { plugin, .. }
            | HostEvent::CloseError { plugin, .. }
            | HostEvent::TaskError { plugin, .. }
            | HostEvent::DispatchError { plugin, .. } => plugin,
            _ => HOST_CATEGORY,
        }
    }

    pub fn message(&self) -> String {
        match self {
            HostEvent::BotStart { username } => format!("bot started: @{username}"),
            HostEvent::BotStop => "bot stopped".to_string(),
            HostEvent::StopRequested => "stopping...".to_string(),
            HostEvent::PluginEnabled { plugin } => format!("plugin '{plugin}' enabled"),
            HostEvent::PluginsEnabled { plugins } => match plugins.len() {
                0 => "no plugins enabled".to_string(),
                _ => format!("enabled plugins: {}", plugins.join(", ")),
            },
            HostEvent::PluginDisabled { plugin } => format!("plugin '{plugin}' disabled"),
            HostEvent::PluginsDisabled { plugins } => match plugins.len() {
                0 => "no plugins disabled".to_string(),
                _ => format!("disabled plugins: {}", plugins.join(", ")),
            },
            HostEvent::PluginReloaded { plugin } => format!("plugin '{plugin}' reloaded"),
            HostEvent::PluginsReloaded { plugins } => match plugins.len() {
                0 => "no plugins reloaded".to_string(),
                _ => format!("reloaded plugins: {}", plugins.join(", ")),
            },
            HostEvent::ShowPlugins { enabled, available } => format!(
                "enabled: [{}] available: [{}]",
                enabled.join(", "),
                available.join(", ")
            ),
            HostEvent::AlreadyEnabled { plugin } => {
                format!("plugin '{plugin}' is already enabled")
            }
            HostEvent::NotEnabled { plugin } => format!("plugin '{plugin}' is not enabled"),
            HostEvent::NotAvailable { name } => format!("no plugin bundle matches '{name}'"),
            HostEvent::LoadError { bundle, reason } => {
                format!("cannot load '{bundle}': {reason}")
            }
            HostEvent::InitError { plugin, reason } => {
                format!("plugin '{plugin}' failed to initialize: {reason}")
            }
            HostEvent::CloseError { plugin, reason } => {
                format!("plugin '{plugin}' failed to close: {reason}")
            }
            HostEvent::TaskError { plugin, reason } => {
                format!("task of plugin '{plugin}' failed: {reason}")
            }
            HostEvent::DispatchError {
                plugin,
                update_id,
                reason,
            } => format!("plugin '{plugin}' failed handling update {update_id}: {reason}"),
            HostEvent::MetadataSyncError { reason } => {
                format!("cannot push command metadata: {reason}")
            }
            HostEvent::PollError { reason } => format!("cannot fetch updates: {reason}"),
            HostEvent::UnknownCommand { name } => format!("unknown command '{name}'"),
            HostEvent::CommandConflict { name, owners } => format!(
                "command '{name}' is registered by several plugins: {} (use <plugin>/{name})",
                owners.join(", ")
            ),
            HostEvent::CommandFailed { name, reason } => {
                format!("command '{name}' failed: {reason}")
            }
            HostEvent::Usage { usage } => format!("usage: {usage}"),
            HostEvent::Help { lines } => lines.join("\n"),
            HostEvent::HostError { reason } => reason.clone(),
        }
    }
}

/// Maps an operation failure onto the event reported for it.
pub fn lifecycle_event(error: &LifecycleError) -> HostEvent {
    match error {
        LifecycleError::AlreadyEnabled(plugin) => HostEvent::AlreadyEnabled {
            plugin: plugin.clone(),
        },
        LifecycleError::NotEnabled(plugin) => HostEvent::NotEnabled {
            plugin: plugin.clone(),
        },
        LifecycleError::Load(e) => HostEvent::LoadError {
            bundle: e.bundle().to_string(),
            reason: e.to_string(),
        },
        LifecycleError::Init { plugin, source } => HostEvent::InitError {
            plugin: plugin.clone(),
            reason: source.to_string(),
        },
        LifecycleError::Internal(reason) => HostEvent::HostError {
            reason: reason.clone(),
        },
    }
}

/// Fans events out to every configured sink.
pub struct EventLog {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl EventLog {
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }

    pub fn log(&self, event: &HostEvent) {
        self.raw(event.level(), event.category(), &event.message());
    }

    /// Forward an already-rendered triple, e.g. a plugin's own log line.
    pub fn raw(&self, level: Level, category: &str, message: &str) {
        for sink in &self.sinks {
            sink.log(level, category, message);
        }
    }
}
