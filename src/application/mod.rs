//! Application layer - the plugin runtime's use cases
//!
//! This layer contains:
//! - Errors: the runtime error taxonomy
//! - Events: structured events handed to the logging collaborator
//! - Messaging: command routing, update fan-out, long-poll driver
//! - Services: command-metadata aggregation

pub mod errors;
pub mod events;
pub mod messaging;
pub mod services;
