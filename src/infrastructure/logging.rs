//! Default logging sink

use tracing::Level;

use crate::domain::traits::LogSink;

/// Bridges runtime log triples into the `tracing` subscriber configured by
/// the process entry point.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, category: &str, message: &str) {
        if level == Level::ERROR {
            tracing::error!(category = %category, "{}", message);
        } else if level == Level::WARN {
            tracing::warn!(category = %category, "{}", message);
        } else {
            tracing::info!(category = %category, "{}", message);
        }
    }
}
