//! plugbot - a plugin-hosting Telegram bot runtime
//!
//! The host loads independently-built plugin bundles at runtime, supervises
//! each one in its own execution context, routes operator console commands
//! and inbound platform updates to them, and keeps one plugin's failure
//! from affecting the host or its siblings.
//!
//! Plugin authors implement [`plugins::Plugin`] and export an entry symbol
//! with the [`plugins::PluginEntryFn`] signature from a `cdylib`, next to a
//! `plugin.yaml` manifest naming it.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;
