//! Command router - routes operator console input
//!
//! Built-in commands always win; everything else is resolved against the
//! enabled plugins' registered commands at dispatch time. Ambiguous tokens
//! are reported as conflicts and never routed to an arbitrary winner.

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::application::events::{lifecycle_event, EventLog, HostEvent};
use crate::infrastructure::plugins::registry::PluginRegistry;
use crate::plugins::manager::{LifecycleManager, Loader};
use crate::plugins::record::{BundleLocation, PluginRecord, RegisteredCommand};

/// Qualifier targeting the host's own command namespace.
pub const HOST_QUALIFIER: &str = "host";

const BUILTIN_USAGE: &[(&str, &str)] = &[
    ("stop", "stop - shut the host down"),
    ("plugins", "plugins - list enabled and available plugins"),
    ("enable", "enable <name|url|*> - enable a plugin"),
    ("disable", "disable <name|*> - disable a plugin"),
    ("reload", "reload <name|*> - reload a plugin"),
    ("help", "help [command] - show help"),
];

/// What the console loop should do after a command was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterFlow {
    Continue,
    Stop,
}

pub struct CommandRouter {
    registry: Arc<PluginRegistry>,
    lifecycle: Arc<LifecycleManager>,
    loader: Arc<dyn Loader>,
    events: Arc<EventLog>,
}

impl CommandRouter {
    pub fn new(
        registry: Arc<PluginRegistry>,
        lifecycle: Arc<LifecycleManager>,
        loader: Arc<dyn Loader>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            registry,
            lifecycle,
            loader,
            events,
        }
    }

    /// Handle one operator line. Emits exactly one outcome event per
    /// handled command; plugin handler failures are contained here and
    /// never reach the console loop.
    pub async fn handle(&self, input: &str) -> RouterFlow {
        let input = input.trim();
        if input.is_empty() {
            return RouterFlow::Continue;
        }
        debug!(%input, "console command received");

        let (name, args) = split_command(input);
        if let Some((qualifier, command)) = name.split_once('/') {
            return self.handle_qualified(qualifier, command, args).await;
        }
        if is_builtin(name) {
            return self.handle_builtin(name, args).await;
        }
        self.dispatch_plugin_command(None, name, args).await;
        RouterFlow::Continue
    }

    /// `plugin/command` targets one plugin directly, bypassing the conflict
    /// search; the reserved `host/` prefix targets built-ins.
    async fn handle_qualified(&self, qualifier: &str, command: &str, args: &str) -> RouterFlow {
        if qualifier == HOST_QUALIFIER {
            if is_builtin(command) {
                return self.handle_builtin(command, args).await;
            }
            self.events.log(&HostEvent::UnknownCommand {
                name: format!("{HOST_QUALIFIER}/{command}"),
            });
            return RouterFlow::Continue;
        }
        match self.registry.search(qualifier) {
            Some(plugin) => {
                self.dispatch_plugin_command(Some(&plugin), command, args)
                    .await
            }
            None => self.events.log(&HostEvent::NotEnabled {
                plugin: qualifier.to_string(),
            }),
        }
        RouterFlow::Continue
    }

    async fn handle_builtin(&self, name: &str, args: &str) -> RouterFlow {
        match name {
            "stop" => {
                self.events.log(&HostEvent::StopRequested);
                return RouterFlow::Stop;
            }
            "plugins" => {
                self.events.log(&HostEvent::ShowPlugins {
                    enabled: self.registry.names(),
                    available: self.loader.available().await,
                });
            }
            "enable" => self.enable_command(args).await,
            "disable" => self.disable_command(args).await,
            "reload" => self.reload_command(args).await,
            "help" => self.help_command(args),
            _ => self.events.log(&HostEvent::UnknownCommand {
                name: name.to_string(),
            }),
        }
        RouterFlow::Continue
    }

    async fn enable_command(&self, args: &str) {
        if args.is_empty() {
            return self.events.log(&HostEvent::Usage {
                usage: "enable <name|url|*>",
            });
        }
        if args == "*" {
            let mut locations = Vec::new();
            for name in self.loader.available().await {
                if let Some(location) = self.loader.resolve(&name).await {
                    locations.push(location);
                }
            }
            let enabled = self.lifecycle.enable_all(locations).await;
            return self.events.log(&HostEvent::PluginsEnabled { plugins: enabled });
        }
        let Some(location) = self.resolve_location(args).await else {
            return self.events.log(&HostEvent::NotAvailable {
                name: args.to_string(),
            });
        };
        match self.lifecycle.enable(&location).await {
            Ok(plugin) => self.events.log(&HostEvent::PluginEnabled { plugin }),
            Err(e) => self.events.log(&lifecycle_event(&e)),
        }
    }

    async fn resolve_location(&self, arg: &str) -> Option<BundleLocation> {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            return Url::parse(arg).ok().map(BundleLocation::Url);
        }
        self.loader.resolve(arg).await
    }

    async fn disable_command(&self, args: &str) {
        if args.is_empty() {
            return self.events.log(&HostEvent::Usage {
                usage: "disable <name|*>",
            });
        }
        if args == "*" {
            let disabled = self.lifecycle.disable_all(self.registry.names()).await;
            return self
                .events
                .log(&HostEvent::PluginsDisabled { plugins: disabled });
        }
        let name = self
            .registry
            .search(args)
            .unwrap_or_else(|| args.to_string());
        match self.lifecycle.disable(&name).await {
            Ok(plugin) => self.events.log(&HostEvent::PluginDisabled { plugin }),
            Err(e) => self.events.log(&lifecycle_event(&e)),
        }
    }

    async fn reload_command(&self, args: &str) {
        if args.is_empty() {
            return self.events.log(&HostEvent::Usage {
                usage: "reload <name|*>",
            });
        }
        if args == "*" {
            let reloaded = self.lifecycle.reload_all(self.registry.names()).await;
            return self
                .events
                .log(&HostEvent::PluginsReloaded { plugins: reloaded });
        }
        let name = self
            .registry
            .search(args)
            .unwrap_or_else(|| args.to_string());
        match self.lifecycle.reload(&name).await {
            Ok(plugin) => self.events.log(&HostEvent::PluginReloaded { plugin }),
            Err(e) => self.events.log(&lifecycle_event(&e)),
        }
    }

    fn help_command(&self, args: &str) {
        if args.is_empty() {
            let mut lines: Vec<String> = BUILTIN_USAGE
                .iter()
                .map(|(_, usage)| (*usage).to_string())
                .collect();
            for record in self.registry.snapshot() {
                for command in record.registrations().commands() {
                    lines.push(command_help_line(record.name(), &command));
                }
            }
            return self.events.log(&HostEvent::Help { lines });
        }

        let topic = args.split_whitespace().next().unwrap_or(args);
        if let Some((_, usage)) = BUILTIN_USAGE.iter().find(|(name, _)| *name == topic) {
            return self.events.log(&HostEvent::Usage { usage });
        }
        let mut lines = Vec::new();
        for record in self.registry.snapshot() {
            if let Some(command) = record.registrations().command(topic) {
                lines.push(command_help_line(record.name(), &command));
            }
        }
        if lines.is_empty() {
            return self.events.log(&HostEvent::UnknownCommand {
                name: topic.to_string(),
            });
        }
        self.events.log(&HostEvent::Help { lines });
    }

    /// Resolve owners from the registry at dispatch time - never cached, so
    /// a disabled plugin can no longer be reached.
    async fn dispatch_plugin_command(&self, only: Option<&str>, name: &str, args: &str) {
        let mut owners: Vec<(Arc<PluginRecord>, RegisteredCommand)> = Vec::new();
        for record in self.registry.snapshot() {
            if let Some(target) = only {
                if record.name() != target {
                    continue;
                }
            }
            if let Some(command) = record.registrations().command(name) {
                owners.push((record, command));
            }
        }

        match owners.len() {
            0 => self.events.log(&HostEvent::UnknownCommand {
                name: name.to_string(),
            }),
            1 => {
                let (record, command) = owners.remove(0);
                let handler = command.handler.clone();
                let args = args.to_string();
                let result = record
                    .context()
                    .run(async move { handler.handle(args).await })
                    .await;
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) | Err(e) => {
                        if !matches!(e, crate::application::errors::PluginError::Cancelled) {
                            self.events.log(&HostEvent::CommandFailed {
                                name: name.to_string(),
                                reason: e.to_string(),
                            });
                        }
                    }
                }
            }
            _ => {
                let names = owners
                    .iter()
                    .map(|(record, _)| record.name().to_string())
                    .collect();
                self.events.log(&HostEvent::CommandConflict {
                    name: name.to_string(),
                    owners: names,
                });
            }
        }
    }
}

/// Split operator input on the first whitespace into (command, raw args).
pub fn split_command(input: &str) -> (&str, &str) {
    match input.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim_start()),
        None => (input, ""),
    }
}

fn is_builtin(name: &str) -> bool {
    BUILTIN_USAGE.iter().any(|(builtin, _)| *builtin == name)
}

fn command_help_line(plugin: &str, command: &RegisteredCommand) -> String {
    let mut line = match &command.usage {
        Some(usage) => usage.clone(),
        None => command.name.clone(),
    };
    if let Some(description) = &command.description {
        line.push_str(" - ");
        line.push_str(description);
    }
    line.push_str(&format!(" [{plugin}]"));
    line
}

#[cfg(test)]
mod tests {
    use super::split_command;

    #[test]
    fn splits_on_first_whitespace() {
        assert_eq!(split_command("ping hello world"), ("ping", "hello world"));
        assert_eq!(split_command("ping"), ("ping", ""));
        assert_eq!(split_command("ping   spaced"), ("ping", "spaced"));
    }
}
