//! Application services

pub mod command_sync;

pub use command_sync::CommandAggregator;
