//! Update dispatcher - fault-isolated fan-out of platform events

use std::sync::Arc;

use crate::application::errors::PluginError;
use crate::application::events::{EventLog, HostEvent};
use crate::domain::entities::Update;
use crate::infrastructure::plugins::registry::PluginRegistry;
use crate::plugins::record::PluginRecord;

/// Which handler list an update is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Updates accumulated while the host was offline, replayed once in
    /// original order before any live traffic.
    Backlog,
    /// Updates arriving while the host runs.
    Live,
}

pub struct UpdateDispatcher {
    registry: Arc<PluginRegistry>,
    events: Arc<EventLog>,
}

impl UpdateDispatcher {
    pub fn new(registry: Arc<PluginRegistry>, events: Arc<EventLog>) -> Self {
        Self { registry, events }
    }

    pub async fn dispatch(&self, update: &Update) {
        self.fan_out(update, Channel::Live).await;
    }

    pub async fn dispatch_backlog(&self, update: &Update) {
        self.fan_out(update, Channel::Backlog).await;
    }

    /// The registry snapshot is taken once per update: plugins enabled or
    /// disabled mid-dispatch do not affect the current fan-out. Deliveries
    /// run concurrently across plugins and sequentially within one plugin.
    async fn fan_out(&self, update: &Update, channel: Channel) {
        let snapshot = self.registry.snapshot();
        let mut deliveries = Vec::with_capacity(snapshot.len());
        for record in snapshot {
            let update = update.clone();
            let events = self.events.clone();
            deliveries.push(tokio::spawn(deliver(record, update, channel, events)));
        }
        for delivery in deliveries {
            let _ = delivery.await;
        }
    }
}

/// Run one plugin's handlers in registration order, inside that plugin's
/// own execution context. A failing handler is logged with the plugin and
/// update identity and does not stop delivery of later handlers or other
/// plugins.
async fn deliver(
    record: Arc<PluginRecord>,
    update: Update,
    channel: Channel,
    events: Arc<EventLog>,
) {
    let handlers = match channel {
        Channel::Backlog => record.registrations().backlog_handlers(),
        Channel::Live => record.registrations().update_handlers(),
    };
    let update_id = update.update_id;
    for handler in handlers {
        let update = update.clone();
        let result = record
            .context()
            .run(async move { handler.handle(update).await })
            .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) | Err(e) => match e {
                PluginError::Cancelled => {}
                e => events.log(&HostEvent::DispatchError {
                    plugin: record.name().to_string(),
                    update_id,
                    reason: e.to_string(),
                }),
            },
        }
    }
}
