//! Domain traits - Abstractions for external collaborators

pub mod log;
pub mod platform;

pub use log::LogSink;
pub use platform::PlatformClient;
