//! Long-poll driver
//!
//! Drains the backlog accumulated while the host was offline, in original
//! order, then feeds live updates to the dispatcher until cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::application::events::{EventLog, HostEvent};
use crate::domain::traits::PlatformClient;

use super::dispatcher::UpdateDispatcher;

pub struct UpdatePoller {
    platform: Arc<dyn PlatformClient>,
    dispatcher: Arc<UpdateDispatcher>,
    events: Arc<EventLog>,
    poll_timeout: Duration,
    back_off: Duration,
    cancel: CancellationToken,
}

impl UpdatePoller {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        dispatcher: Arc<UpdateDispatcher>,
        events: Arc<EventLog>,
        poll_timeout: Duration,
        back_off: Duration,
    ) -> Self {
        Self {
            platform,
            dispatcher,
            events,
            poll_timeout,
            back_off,
            cancel: CancellationToken::new(),
        }
    }

    /// Request the poll loop to finish after the in-flight dispatch.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub async fn run(&self) {
        let mut offset = self.drain_backlog().await;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                batch = self.platform.get_updates(offset, self.poll_timeout) => match batch {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            self.dispatcher.dispatch(&update).await;
                        }
                    }
                    Err(e) => {
                        self.events.log(&HostEvent::PollError {
                            reason: e.to_string(),
                        });
                        tokio::time::sleep(self.back_off).await;
                    }
                }
            }
        }
    }

    /// Zero-timeout polls until an empty batch marks the backlog drained.
    /// Every backlog update is fully dispatched before live polling starts.
    async fn drain_backlog(&self) -> i64 {
        let mut offset = 0;
        loop {
            if self.cancel.is_cancelled() {
                return offset;
            }
            match self.platform.get_updates(offset, Duration::ZERO).await {
                Ok(updates) if updates.is_empty() => return offset,
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        self.dispatcher.dispatch_backlog(&update).await;
                    }
                }
                Err(e) => {
                    self.events.log(&HostEvent::PollError {
                        reason: e.to_string(),
                    });
                    tokio::time::sleep(self.back_off).await;
                }
            }
        }
    }
}
