#![allow(dead_code)]
//! Shared fixtures: an in-process fake loader, a fake platform client, a
//! recording log sink and a configurable test plugin.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tracing::Level;

use plugbot::application::errors::{LoadError, PlatformError, PluginError};
use plugbot::application::events::EventLog;
use plugbot::application::messaging::{CommandRouter, UpdateDispatcher};
use plugbot::application::services::CommandAggregator;
use plugbot::domain::entities::{BotCommand, Chat, CommandScope, Message, Update};
use plugbot::domain::traits::{LogSink, PlatformClient};
use plugbot::infrastructure::plugins::registry::PluginRegistry;
use plugbot::plugins::api::{Plugin, PluginResult};
use plugbot::plugins::handle::{HostServices, PluginHandle};
use plugbot::plugins::manager::{LifecycleManager, Loader};
use plugbot::plugins::record::{BundleLocation, PluginRecord};

/// Sink that records every (level, category, message) triple.
#[derive(Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<(Level, String, String)>>,
}

impl RecordingSink {
    pub fn entries(&self) -> Vec<(Level, String, String)> {
        self.entries.lock().expect("sink lock").clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("sink lock").len()
    }

    pub fn messages_containing(&self, needle: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(_, _, message)| message.contains(needle))
            .map(|(_, _, message)| message)
            .collect()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages_containing(needle).len()
    }

    pub fn count_for_category(&self, category: &str) -> usize {
        self.entries()
            .into_iter()
            .filter(|(_, c, _)| c == category)
            .count()
    }
}

impl LogSink for RecordingSink {
    fn log(&self, level: Level, category: &str, message: &str) {
        self.entries
            .lock()
            .expect("sink lock")
            .push((level, category.to_string(), message.to_string()));
    }
}

/// Platform client that records outbound calls and serves queued update
/// batches. An exhausted queue behaves like an idle long poll.
#[derive(Default)]
pub struct FakePlatform {
    pub sent: Mutex<Vec<(i64, String)>>,
    pushes: Mutex<Vec<(CommandScope, Option<String>, Vec<BotCommand>)>>,
    batches: Mutex<VecDeque<Vec<Update>>>,
    pub fail_set_commands: AtomicBool,
}

impl FakePlatform {
    pub fn queue_batch(&self, updates: Vec<Update>) {
        self.batches.lock().expect("batches lock").push_back(updates);
    }

    pub fn pushes(&self) -> Vec<(CommandScope, Option<String>, Vec<BotCommand>)> {
        self.pushes.lock().expect("pushes lock").clone()
    }

    pub fn clear_pushes(&self) {
        self.pushes.lock().expect("pushes lock").clear();
    }

    /// Commands of the most recent push for the (default, no-locale) group.
    pub fn last_default_push(&self) -> Option<Vec<BotCommand>> {
        self.pushes()
            .into_iter()
            .rev()
            .find(|(scope, locale, _)| *scope == CommandScope::Default && locale.is_none())
            .map(|(_, _, commands)| commands)
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), PlatformError> {
        self.sent
            .lock()
            .expect("sent lock")
            .push((chat_id, text.to_string()));
        Ok(())
    }

    async fn get_updates(
        &self,
        _offset: i64,
        _timeout: Duration,
    ) -> Result<Vec<Update>, PlatformError> {
        let batch = self.batches.lock().expect("batches lock").pop_front();
        if let Some(batch) = batch {
            return Ok(batch);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(Vec::new())
    }

    async fn set_commands(
        &self,
        scope: &CommandScope,
        locale: Option<&str>,
        commands: &[BotCommand],
    ) -> Result<(), PlatformError> {
        if self.fail_set_commands.load(Ordering::SeqCst) {
            return Err(PlatformError::Api("push refused".to_string()));
        }
        self.pushes.lock().expect("pushes lock").push((
            scope.clone(),
            locale.map(|l| l.to_string()),
            commands.to_vec(),
        ));
        Ok(())
    }
}

type Setup = dyn Fn(&PluginHandle) + Send + Sync;

/// Plugin whose init runs a configurable setup against its handle.
pub struct TestPlugin {
    setup: Arc<Setup>,
    fail_init: bool,
    fail_close: bool,
    closed: Arc<AtomicBool>,
}

impl TestPlugin {
    pub fn new() -> Self {
        Self {
            setup: Arc::new(|_| {}),
            fail_init: false,
            fail_close: false,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_setup(mut self, setup: impl Fn(&PluginHandle) + Send + Sync + 'static) -> Self {
        self.setup = Arc::new(setup);
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }
}

#[async_trait]
impl Plugin for TestPlugin {
    async fn init(&self, handle: PluginHandle) -> PluginResult<()> {
        if self.fail_init {
            return Err(PluginError::msg("init refused"));
        }
        (self.setup)(&handle);
        Ok(())
    }

    async fn close(&self) -> PluginResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            return Err(PluginError::msg("close refused"));
        }
        Ok(())
    }
}

/// Sets its flag when dropped; used to prove a task was torn down.
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

type Factory = dyn Fn() -> Arc<dyn Plugin> + Send + Sync;

/// Loader seam mapping bundle names to in-process plugin factories, wired
/// exactly like the production loader.
pub struct FakeLoader {
    root: PathBuf,
    factories: Mutex<HashMap<String, Arc<Factory>>>,
    services: HostServices,
}

impl FakeLoader {
    pub fn new(root: PathBuf, services: HostServices) -> Self {
        Self {
            root,
            factories: Mutex::new(HashMap::new()),
            services,
        }
    }

    /// Register (or replace) the factory behind a bundle name.
    pub fn register(&self, name: &str, factory: impl Fn() -> Arc<dyn Plugin> + Send + Sync + 'static) {
        self.factories
            .lock()
            .expect("factories lock")
            .insert(name.to_string(), Arc::new(factory));
    }

    pub fn location(&self, name: &str) -> BundleLocation {
        BundleLocation::Path(self.root.join(name))
    }

    pub fn bundle_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl Loader for FakeLoader {
    async fn load(
        &self,
        location: &BundleLocation,
    ) -> Result<(Arc<PluginRecord>, PluginHandle), LoadError> {
        let BundleLocation::Path(path) = location else {
            return Err(LoadError::BundleUnreadable {
                bundle: location.to_string(),
                reason: "fake loader only supports paths".to_string(),
            });
        };
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let factory = self
            .factories
            .lock()
            .expect("factories lock")
            .get(&name)
            .cloned()
            .ok_or(LoadError::MissingManifest {
                bundle: name.clone(),
            })?;
        let instance = factory();
        Ok(self
            .services
            .wire(&name, location.clone(), path.clone(), instance, None))
    }

    async fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .lock()
            .expect("factories lock")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    async fn resolve(&self, name: &str) -> Option<BundleLocation> {
        let available = self.available().await;
        let prefix = name.to_lowercase();
        let found = available
            .iter()
            .find(|n| n.eq_ignore_ascii_case(name))
            .or_else(|| {
                available
                    .iter()
                    .find(|n| n.to_lowercase().starts_with(&prefix))
            })?;
        Some(BundleLocation::Path(self.root.join(found)))
    }
}

/// Fully wired runtime against fake collaborators.
pub struct Harness {
    pub registry: Arc<PluginRegistry>,
    pub lifecycle: Arc<LifecycleManager>,
    pub loader: Arc<FakeLoader>,
    pub platform: Arc<FakePlatform>,
    pub sink: Arc<RecordingSink>,
    pub events: Arc<EventLog>,
    pub dispatcher: Arc<UpdateDispatcher>,
    pub router: CommandRouter,
    pub console_rx: mpsc::Receiver<String>,
    _workdir: TempDir,
}

pub fn harness() -> Harness {
    let workdir = TempDir::new().expect("temp dir");
    let sink = Arc::new(RecordingSink::default());
    let sinks: Vec<Arc<dyn LogSink>> = vec![sink.clone()];
    let events = Arc::new(EventLog::new(sinks));
    let platform = Arc::new(FakePlatform::default());
    let platform_dyn: Arc<dyn PlatformClient> = platform.clone();

    let registry = Arc::new(PluginRegistry::new());
    let commands_sync = Arc::new(CommandAggregator::new(
        registry.clone(),
        platform_dyn.clone(),
        events.clone(),
    ));
    let (console_tx, console_rx) = mpsc::channel(16);
    let services = HostServices {
        events: events.clone(),
        platform: platform_dyn,
        commands_sync: commands_sync.clone(),
        console_tx,
    };
    let loader = Arc::new(FakeLoader::new(workdir.path().to_path_buf(), services));
    let loader_dyn: Arc<dyn Loader> = loader.clone();
    let lifecycle = Arc::new(LifecycleManager::new(
        registry.clone(),
        loader_dyn.clone(),
        commands_sync,
        events.clone(),
    ));
    let dispatcher = Arc::new(UpdateDispatcher::new(registry.clone(), events.clone()));
    let router = CommandRouter::new(
        registry.clone(),
        lifecycle.clone(),
        loader_dyn,
        events.clone(),
    );

    Harness {
        registry,
        lifecycle,
        loader,
        platform,
        sink,
        events,
        dispatcher,
        router,
        console_rx,
        _workdir: workdir,
    }
}

pub fn update(id: i64, text: &str) -> Update {
    Update {
        update_id: id,
        message: Some(Message {
            message_id: id,
            from: None,
            chat: Chat { id: 1 },
            text: Some(text.to_string()),
        }),
        callback_query: None,
    }
}

/// Poll `predicate` until it holds or about a second passes.
pub async fn wait_for(mut predicate: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    predicate()
}
