//! Per-plugin supervised execution context

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::application::errors::PluginError;
use crate::application::events::{EventLog, HostEvent};
use crate::plugins::api::PluginResult;

/// Supervised task group owned by one plugin.
///
/// Spawned work is tracked; a task's error or panic is reported under the
/// owning plugin's log category and never affects sibling tasks or the host.
/// `shutdown` cancels everything and awaits termination, so no background
/// work survives an unload.
#[derive(Clone)]
pub struct TaskGroup {
    plugin: Arc<str>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    events: Arc<EventLog>,
}

impl TaskGroup {
    pub fn new(plugin: &str, events: Arc<EventLog>) -> Self {
        Self {
            plugin: Arc::from(plugin),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            events,
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Fire-and-forget background work owned by the plugin.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = PluginResult<()>> + Send + 'static,
    {
        let plugin = self.plugin.clone();
        let events = self.events.clone();
        let cancel = self.cancel.clone();
        self.tracker.spawn(async move {
            let mut task = tokio::spawn(future);
            tokio::select! {
                _ = cancel.cancelled() => {
                    task.abort();
                    let _ = task.await;
                }
                result = &mut task => match flatten(result) {
                    Ok(()) | Err(PluginError::Cancelled) => {}
                    Err(e) => events.log(&HostEvent::TaskError {
                        plugin: plugin.to_string(),
                        reason: e.to_string(),
                    }),
                }
            }
        });
    }

    /// Run `future` to completion inside this context, capturing errors,
    /// panics and cancellation instead of letting them unwind.
    pub async fn run<T, F>(&self, future: F) -> Result<T, PluginError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut task = self.tracker.spawn(future);
        tokio::select! {
            _ = self.cancel.cancelled() => {
                task.abort();
                let _ = task.await;
                Err(PluginError::Cancelled)
            }
            result = &mut task => match result {
                Ok(value) => Ok(value),
                Err(e) if e.is_panic() => Err(PluginError::Panic(panic_message(e))),
                Err(_) => Err(PluginError::Cancelled),
            }
        }
    }

    /// Cancel all outstanding tasks and wait for them to terminate.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

fn flatten(result: Result<PluginResult<()>, JoinError>) -> PluginResult<()> {
    match result {
        Ok(inner) => inner,
        Err(e) if e.is_panic() => Err(PluginError::Panic(panic_message(e))),
        Err(_) => Err(PluginError::Cancelled),
    }
}

fn panic_message(error: JoinError) -> String {
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
