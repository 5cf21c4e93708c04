//! Plugin registry - the authoritative table of enabled plugins

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::plugins::record::PluginRecord;

/// Single-writer map of enabled plugins keyed by unique name.
///
/// All mutation goes through the lifecycle manager; the router, dispatcher
/// and aggregator only take point-in-time snapshots and never hold records
/// across operations.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, Arc<PluginRecord>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly enabled plugin. A duplicate name is an invariant
    /// violation, not an expected failure: the lifecycle manager checks
    /// before initializing.
    pub fn insert(&self, record: Arc<PluginRecord>) -> Result<(), String> {
        let mut plugins = self
            .plugins
            .write()
            .map_err(|_| "registry lock poisoned".to_string())?;
        if plugins.contains_key(record.name()) {
            return Err(format!("duplicate registry entry '{}'", record.name()));
        }
        plugins.insert(record.name().to_string(), record);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Option<Arc<PluginRecord>> {
        self.plugins.write().ok()?.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<PluginRecord>> {
        self.plugins.read().ok()?.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins
            .read()
            .map(|plugins| plugins.contains_key(name))
            .unwrap_or(false)
    }

    /// Enabled plugin names, sorted for deterministic output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .plugins
            .read()
            .map(|plugins| plugins.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Point-in-time view of every enabled plugin, sorted by name.
    pub fn snapshot(&self) -> Vec<Arc<PluginRecord>> {
        let mut records: Vec<Arc<PluginRecord>> = self
            .plugins
            .read()
            .map(|plugins| plugins.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by(|a, b| a.name().cmp(b.name()));
        records
    }

    /// Resolve an operator-typed name: exact match first, then the first
    /// case-insensitive prefix match in name order.
    pub fn search(&self, name: &str) -> Option<String> {
        if name.is_empty() {
            return None;
        }
        let names = self.names();
        if let Some(exact) = names.iter().find(|n| n.eq_ignore_ascii_case(name)) {
            return Some(exact.clone());
        }
        let prefix = name.to_lowercase();
        names
            .iter()
            .find(|n| n.to_lowercase().starts_with(&prefix))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.plugins
            .read()
            .map(|plugins| plugins.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
