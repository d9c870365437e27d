//! Shared fixtures for the integration tests: a recording module, a log
//! capture layer and polling helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::sync::{Arc, LazyLock, Mutex, Once};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use mumo_core::config::{ModuleConfig, ModulesConfig};
use mumo_plugin::prelude::*;
use mumo_plugin::{Manager, ManagerHandle};

// ── Log capture ──────────────────────────────────────────────────

/// One captured log event.
#[derive(Debug, Clone)]
pub struct Captured {
    pub level: Level,
    pub thread: String,
    pub text: String,
}

static LOGS: LazyLock<Mutex<Vec<Captured>>> = LazyLock::new(|| Mutex::new(Vec::new()));
static INSTALL: Once = Once::new();

struct CaptureLayer;

#[derive(Default)]
struct TextVisitor(String);

impl Visit for TextVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let _ = write!(self.0, "{}={:?} ", field.name(), value);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        let _ = write!(self.0, "{}={} ", field.name(), value);
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = TextVisitor::default();
        event.record(&mut visitor);
        let captured = Captured {
            level: *event.metadata().level(),
            thread: thread::current().name().unwrap_or("").to_string(),
            text: visitor.0,
        };
        LOGS.lock().unwrap_or_else(|e| e.into_inner()).push(captured);
    }
}

/// Install the capture layer as the global subscriber. Module threads do
/// not inherit a thread-local default, so it has to be global.
pub fn capture_logs() {
    INSTALL.call_once(|| {
        let subscriber = tracing_subscriber::registry().with(CaptureLayer);
        tracing::subscriber::set_global_default(subscriber).expect("install capture subscriber");
    });
}

/// Captured events at `level` whose text contains every needle.
pub fn logged(level: Level, needles: &[&str]) -> Vec<Captured> {
    LOGS.lock()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .filter(|c| c.level == level && needles.iter().all(|n| c.text.contains(n)))
        .cloned()
        .collect()
}

// ── Polling ──────────────────────────────────────────────────────

/// Poll `cond` until it holds or five seconds pass.
pub fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}

// ── Journals ─────────────────────────────────────────────────────

/// What a recorder module observed, in order.
pub type Journal = Arc<Mutex<Vec<String>>>;

static JOURNALS: LazyLock<Mutex<HashMap<String, Journal>>> = LazyLock::new(|| Mutex::new(HashMap::new()));

/// The journal of module `name`.
pub fn journal(name: &str) -> Journal {
    let mut journals = JOURNALS.lock().unwrap_or_else(|e| e.into_inner());
    Arc::clone(journals.entry(name.to_string()).or_default())
}

/// Snapshot of the journal of module `name`.
pub fn entries(name: &str) -> Vec<String> {
    journal(name).lock().unwrap_or_else(|e| e.into_inner()).clone()
}

/// Broadcast a connect announcement and wait until module `name` saw it.
/// Everything announced before is then processed by that module.
pub fn settle(handle: &ManagerHandle, meta: Arc<dyn MetaProxy>, name: &str) {
    let count = |n: &str| entries(n).iter().filter(|e| *e == "connected").count();
    let before = count(name);
    handle.announce_connected(meta);
    assert!(wait_for(|| count(name) > before), "module '{name}' never settled");
}

// ── Recorder module ──────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Server subscriptions; empty together with `all = false` means none.
    pub servers: Vec<i32>,
    /// Also subscribe to every server.
    pub all: bool,
    /// Context callback subscriptions.
    pub context: Vec<i32>,
    /// Context menu action added for every connecting user.
    pub menu_action: Option<String>,
    /// Milliseconds `on_stop` sleeps.
    pub stop_delay_ms: u64,
    /// Resolve no handlers at all.
    pub deaf: bool,
    /// Fail every server callback with this message.
    pub fail_with: Option<String>,
}

/// Test module that writes every callback into its journal.
pub struct Recorder {
    journal: Journal,
    config: RecorderConfig,
}

impl Recorder {
    fn log(&self, entry: impl Into<String>) {
        self.journal.lock().unwrap_or_else(|e| e.into_inner()).push(entry.into());
    }

    fn scopes(&self) -> Vec<ServerScope> {
        let mut scopes: Vec<ServerScope> = self
            .config
            .servers
            .iter()
            .map(|id| ServerScope::Server(ServerId(*id)))
            .collect();
        if self.config.all {
            scopes.push(ServerScope::All);
        }
        scopes
    }

    fn fail(&self) -> AppResult<()> {
        match &self.config.fail_with {
            Some(message) => Err(AppError::conflict(message.clone())),
            None => Ok(()),
        }
    }
}

/// Factory of [`Recorder`], configured from its `[recorder]` section.
pub fn recorder(name: &str, remote: &mut ModuleRemote, config: ModuleConfig) -> AppResult<Box<dyn Module>> {
    let config: RecorderConfig = config.section("recorder")?;
    let recorder = Recorder {
        journal: journal(name),
        config,
    };

    let scopes = recorder.scopes();
    if !scopes.is_empty() {
        remote.subscribe_server_callbacks(HandlerKey::module(), &scopes)?;
        remote.subscribe_meta_callbacks(HandlerKey::module(), &scopes)?;
    }
    if !recorder.config.context.is_empty() {
        let context: Vec<ServerScope> = recorder
            .config
            .context
            .iter()
            .map(|id| ServerScope::Server(ServerId(*id)))
            .collect();
        remote.subscribe_context_callbacks(HandlerKey::module(), &context)?;
    }
    Ok(Box::new(recorder))
}

/// Factory that always fails.
pub fn broken(_: &str, _: &mut ModuleRemote, _: ModuleConfig) -> AppResult<Box<dyn Module>> {
    Err(AppError::internal("missing dependency"))
}

/// Factory that panics.
pub fn exploding(_: &str, _: &mut ModuleRemote, _: ModuleConfig) -> AppResult<Box<dyn Module>> {
    panic!("constructor exploded")
}

impl Module for Recorder {
    fn on_start(&mut self, _remote: &mut ModuleRemote) -> AppResult<()> {
        self.log("on_start");
        Ok(())
    }

    fn on_stop(&mut self, _remote: &mut ModuleRemote) -> AppResult<()> {
        thread::sleep(Duration::from_millis(self.config.stop_delay_ms));
        self.log("on_stop");
        Ok(())
    }

    fn connected(&mut self, _remote: &mut ModuleRemote) -> AppResult<()> {
        self.log("connected");
        Ok(())
    }

    fn disconnected(&mut self, _remote: &mut ModuleRemote) -> AppResult<()> {
        self.log("disconnected");
        Ok(())
    }

    fn meta_handler(&mut self, key: &HandlerKey) -> Option<&mut dyn MetaCallbacks> {
        (!self.config.deaf && *key == HandlerKey::module()).then_some(self as &mut dyn MetaCallbacks)
    }

    fn server_handler(&mut self, key: &HandlerKey) -> Option<&mut dyn ServerCallbacks> {
        (!self.config.deaf && *key == HandlerKey::module()).then_some(self as &mut dyn ServerCallbacks)
    }

    fn context_handler(&mut self, key: &HandlerKey) -> Option<&mut dyn ContextCallbacks> {
        (!self.config.deaf && *key == HandlerKey::module()).then_some(self as &mut dyn ContextCallbacks)
    }

    fn menu_handler(&mut self, key: &HandlerKey) -> Option<&mut dyn ContextMenuHandler> {
        (*key == HandlerKey::module()).then_some(self as &mut dyn ContextMenuHandler)
    }
}

impl MetaCallbacks for Recorder {
    fn started(&mut self, _remote: &mut ModuleRemote, server: &Arc<dyn ServerProxy>) -> AppResult<()> {
        self.log(format!("started:{}", server.id()));
        Ok(())
    }

    fn stopped(&mut self, _remote: &mut ModuleRemote, server: &Arc<dyn ServerProxy>) -> AppResult<()> {
        self.log(format!("stopped:{}", server.id()));
        Ok(())
    }
}

impl ServerCallbacks for Recorder {
    fn user_connected(
        &mut self,
        remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        user: &User,
    ) -> AppResult<()> {
        self.fail()?;
        self.log(format!("user_connected:{}:{}", server.id(), user.name));
        if let Some(action) = &self.config.menu_action {
            remote.add_context_menu_entry(
                server,
                user,
                &ActionId::new(action.clone()),
                "Poke",
                HandlerKey::module(),
                ContextMask::USER,
            )?;
            self.log(format!("menu_added:{}", user.name));
        }
        Ok(())
    }

    fn user_disconnected(
        &mut self,
        _remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        user: &User,
    ) -> AppResult<()> {
        self.log(format!("user_disconnected:{}:{}", server.id(), user.name));
        Ok(())
    }

    fn user_state_changed(
        &mut self,
        _remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        user: &User,
    ) -> AppResult<()> {
        self.log(format!("user_state_changed:{}:{}", server.id(), user.name));
        Ok(())
    }

    fn user_text_message(
        &mut self,
        remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        user: &User,
        message: &TextMessage,
    ) -> AppResult<()> {
        if message.text == "remove" {
            if let Some(action) = &self.config.menu_action {
                remote.remove_user_context_menu_entry(server.id(), user.session, &ActionId::new(action.clone()))?;
            }
        }
        self.log(format!("text:{}:{}", user.name, message.text));
        Ok(())
    }
}

impl ContextCallbacks for Recorder {
    fn context_action(
        &mut self,
        _remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        action: &ActionId,
        user: &User,
        _session: Option<SessionId>,
        _channel: Option<ChannelId>,
    ) -> AppResult<()> {
        self.log(format!("context:{}:{}:{}", server.id(), action, user.name));
        Ok(())
    }
}

impl ContextMenuHandler for Recorder {
    fn on_action(
        &mut self,
        _remote: &mut ModuleRemote,
        _server: &Arc<dyn ServerProxy>,
        action: &ActionId,
        user: &User,
        target: &ContextTarget,
    ) -> AppResult<()> {
        self.log(format!("menu:{}:{}:{}", action, user.name, target));
        Ok(())
    }
}

// ── Manager setup ────────────────────────────────────────────────

/// A started manager with the given join timeout.
pub fn manager(timeout_secs: u64) -> Manager {
    let config = ModulesConfig {
        timeout: timeout_secs,
        ..ModulesConfig::default()
    };
    let mut manager = Manager::new(config, ModuleCatalog::new());
    manager.start().expect("start manager");
    manager
}

/// Load and start a recorder named `name` configured by `recorder`.
pub fn spawn_recorder(handle: &ManagerHandle, name: &str, recorder_config: serde_json::Value) {
    let config = ModuleConfig::from_json(serde_json::json!({ "recorder": recorder_config }))
        .expect("recorder config");
    handle.load_module_with(name, recorder, config).expect("load recorder");
    let started = handle.start_modules(Some(vec![name.to_string()])).expect("start recorder");
    assert_eq!(started, vec![name.to_string()]);
}
