//! Messaging - command routing, update fan-out and the long-poll driver

pub mod dispatcher;
pub mod poller;
pub mod router;

pub use dispatcher::{Channel, UpdateDispatcher};
pub use poller::UpdatePoller;
pub use router::{CommandRouter, RouterFlow};
