//! Plugin capability contract
//!
//! Every bundle exports one entry symbol producing an object that satisfies
//! [`Plugin`]. Registration of handlers and commands happens through the
//! [`PluginHandle`](super::handle::PluginHandle) passed to `init`.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::PluginError;
use crate::domain::entities::Update;

use super::handle::PluginHandle;

pub type PluginResult<T> = Result<T, PluginError>;

/// Contract every plugin entry object must satisfy.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Called once after loading, inside the plugin's execution context.
    /// A returned error (or panic) discards the plugin before it is ever
    /// registered.
    async fn init(&self, handle: PluginHandle) -> PluginResult<()>;

    /// Called at disable time, after the registry entry is already gone.
    async fn close(&self) -> PluginResult<()> {
        Ok(())
    }
}

/// Invoked for every update fanned out to the owning plugin.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    async fn handle(&self, update: Update) -> PluginResult<()>;
}

/// Console command handler; receives the raw argument string.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, args: String) -> PluginResult<()>;
}

/// Signature of the entry symbol a bundle must export. Returning null is a
/// contract violation and fails the load.
pub type PluginEntryFn = unsafe extern "C" fn() -> *mut dyn Plugin;

/// Console command registration.
pub struct CommandSpec {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) usage: Option<String>,
    pub(crate) handler: Arc<dyn CommandHandler>,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, handler: impl CommandHandler + 'static) -> Self {
        Self {
            name: name.into(),
            description: None,
            usage: None,
            handler: Arc::new(handler),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }
}

struct FnCommand<F>(F);

#[async_trait]
impl<F, Fut> CommandHandler for FnCommand<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PluginResult<()>> + Send + 'static,
{
    async fn handle(&self, args: String) -> PluginResult<()> {
        (self.0)(args).await
    }
}

/// Adapt an async closure into a [`CommandHandler`].
pub fn command_fn<F, Fut>(f: F) -> impl CommandHandler + 'static
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PluginResult<()>> + Send + 'static,
{
    FnCommand(f)
}

struct FnUpdateHandler<F>(F);

#[async_trait]
impl<F, Fut> UpdateHandler for FnUpdateHandler<F>
where
    F: Fn(Update) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PluginResult<()>> + Send + 'static,
{
    async fn handle(&self, update: Update) -> PluginResult<()> {
        (self.0)(update).await
    }
}

/// Adapt an async closure into an [`UpdateHandler`].
pub fn update_fn<F, Fut>(f: F) -> impl UpdateHandler + 'static
where
    F: Fn(Update) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PluginResult<()>> + Send + 'static,
{
    FnUpdateHandler(f)
}
