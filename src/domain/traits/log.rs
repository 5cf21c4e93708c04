use tracing::Level;

/// Logging collaborator: receives structured (level, category, message)
/// triples produced by the runtime. The runtime never formats final output
/// lines itself; sinks decide how a triple becomes text.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, category: &str, message: &str);
}
