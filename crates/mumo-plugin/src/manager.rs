//! Module manager: a privileged actor owning the subscription registries,
//! the loaded-module table and the connection state.
//!
//! Everything in [`ManagerState`] is touched only by the manager thread.
//! Other threads go through a [`ManagerHandle`], which marshals each
//! operation onto the manager's mailbox.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use mumo_core::config::{ModuleConfig, ModulesConfig};
use mumo_core::error::{AppError, ErrorKind};
use mumo_core::result::AppResult;
use mumo_core::types::{ActionId, CallbackId, HandlerKey, MailboxId, ServerScope};
use mumo_transport::{ContextCallback, MetaProxy, ServerProxy};
use mumo_worker::{Actor, Mailbox, Worker, panic_message};

use crate::bridge::MenuForwarder;
use crate::catalog::{ModuleCatalog, ModuleFactory};
use crate::events::{ContextEvent, MetaEvent, ServerEvent};
use crate::loader::{self, Imports};
use crate::module::{ModuleHost, ModuleMailbox};
use crate::registry::{Category, Subscription, SubscriptionRegistry};
use crate::remote::{Deferred, ModuleRemote};

/// Snapshot of one loaded module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
    /// Module name.
    pub name: String,
    /// Identity of the module's mailbox, as used by subscriptions.
    pub mailbox: MailboxId,
    /// Whether the module thread is alive.
    pub running: bool,
    /// When the module was loaded.
    pub loaded_at: DateTime<Utc>,
}

struct LoadedModule {
    worker: Worker<ModuleHost>,
    loaded_at: DateTime<Utc>,
}

/// A dispatch callback handed out by [`ManagerHandle::create_context_callback`].
struct ContextRegistration {
    mailbox: MailboxId,
    server: Arc<dyn ServerProxy>,
    action: ActionId,
}

/// Actor state of the manager thread.
pub struct ManagerState {
    config: ModulesConfig,
    catalog: ModuleCatalog,
    handle: ManagerHandle,
    modules: BTreeMap<String, LoadedModule>,
    imports: Imports,
    meta_callbacks: SubscriptionRegistry,
    server_callbacks: SubscriptionRegistry,
    context_callbacks: SubscriptionRegistry,
    context_dispatch: HashMap<CallbackId, ContextRegistration>,
    meta: Option<Arc<dyn MetaProxy>>,
}

impl ManagerState {
    fn new(config: ModulesConfig, catalog: ModuleCatalog, handle: ManagerHandle) -> Self {
        Self {
            config,
            catalog,
            handle,
            modules: BTreeMap::new(),
            imports: Imports::default(),
            meta_callbacks: SubscriptionRegistry::new(),
            server_callbacks: SubscriptionRegistry::new(),
            context_callbacks: SubscriptionRegistry::new(),
            context_dispatch: HashMap::new(),
            meta: None,
        }
    }

    fn registry(&mut self, category: Category) -> &mut SubscriptionRegistry {
        match category {
            Category::Meta => &mut self.meta_callbacks,
            Category::Server => &mut self.server_callbacks,
            Category::Context => &mut self.context_callbacks,
        }
    }

    // ── Subscriptions ────────────────────────────────────────────

    fn subscribe(
        &mut self,
        category: Category,
        mailbox: &ModuleMailbox,
        key: HandlerKey,
        scopes: &[ServerScope],
    ) -> usize {
        let added = self.registry(category).add(mailbox, &key, scopes);
        debug!(
            module = %mailbox.name(),
            category = %category,
            key = %key,
            added,
            "Subscribe"
        );
        if added > 0 {
            mailbox.cast(move |host| host.verify_handler(category, &key));
        }
        added
    }

    fn unsubscribe(
        &mut self,
        category: Category,
        mailbox: MailboxId,
        key: &HandlerKey,
        scopes: &[ServerScope],
    ) -> usize {
        let removed = self.registry(category).remove(mailbox, key, scopes);
        debug!(category = %category, key = %key, removed, "Unsubscribe");
        removed
    }

    fn apply_deferred(&mut self, mailbox: &ModuleMailbox, deferred: Vec<Deferred>) {
        for change in deferred {
            if change.subscribe {
                self.subscribe(change.category, mailbox, change.key, &change.scopes);
            } else {
                self.unsubscribe(change.category, mailbox.id(), &change.key, &change.scopes);
            }
        }
    }

    // ── Announcements ────────────────────────────────────────────

    fn announce_meta(&mut self, server: Arc<dyn ServerProxy>, event: MetaEvent) {
        let server_id = server.id();
        let subscribers = self.meta_callbacks.subscribers(server_id);
        debug!(server_id = %server_id, event = event.name(), subscribers = subscribers.len(), "Announce meta");

        let event = Arc::new(event);
        for (mailbox, key) in subscribers {
            let server = Arc::clone(&server);
            let event = Arc::clone(&event);
            mailbox.cast(move |host| host.deliver_meta(&key, &server, &event));
        }

        if *event == MetaEvent::Stopped {
            self.broadcast(move |host| host.forget_server(server_id));
        }
    }

    fn announce_server(&mut self, server: Arc<dyn ServerProxy>, event: ServerEvent) {
        let server_id = server.id();
        let subscribers = self.server_callbacks.subscribers(server_id);
        debug!(server_id = %server_id, event = event.name(), subscribers = subscribers.len(), "Announce server");

        let event = Arc::new(event);
        for (mailbox, key) in subscribers {
            let server = Arc::clone(&server);
            let event = Arc::clone(&event);
            mailbox.cast(move |host| host.deliver_server(&key, &server, &event));
        }

        if let ServerEvent::UserDisconnected(user) = event.as_ref() {
            let session = user.session;
            self.broadcast(move |host| host.forget_session(server_id, session));
        }
    }

    fn announce_context(&mut self, server: Arc<dyn ServerProxy>, event: ContextEvent) {
        let server_id = server.id();
        let subscribers = self.context_callbacks.subscribers(server_id);
        debug!(server_id = %server_id, event = event.name(), subscribers = subscribers.len(), "Announce context");

        let event = Arc::new(event);
        for (mailbox, key) in subscribers {
            let server = Arc::clone(&server);
            let event = Arc::clone(&event);
            mailbox.cast(move |host| host.deliver_context(&key, &server, &event));
        }
    }

    fn announce_connected(&mut self, meta: Arc<dyn MetaProxy>) {
        info!(modules = self.modules.len(), "Announce connected");
        self.meta = Some(meta);
        self.broadcast(|host| host.connected());
    }

    fn announce_disconnected(&mut self) {
        info!(modules = self.modules.len(), "Announce disconnected");
        self.meta = None;
        self.broadcast(|host| host.disconnected());
    }

    /// Cast `f` to every loaded module, subscribed or not.
    fn broadcast<F>(&self, f: F)
    where
        F: Fn(&mut ModuleHost) -> AppResult<()> + Clone + Send + 'static,
    {
        for loaded in self.modules.values() {
            loaded.worker.mailbox().cast(f.clone());
        }
    }

    // ── Context callbacks ────────────────────────────────────────

    fn create_context_callback(
        &mut self,
        mailbox: ModuleMailbox,
        server: Arc<dyn ServerProxy>,
        action: ActionId,
    ) -> ContextCallback {
        let listener = Arc::new(MenuForwarder::new(mailbox.clone(), server.id()));
        let callback = ContextCallback::new(listener);
        debug!(
            module = %mailbox.name(),
            server_id = %server.id(),
            action = %action,
            callback = %callback.id,
            "Created context callback"
        );
        self.context_dispatch.insert(
            callback.id,
            ContextRegistration {
                mailbox: mailbox.id(),
                server,
                action,
            },
        );
        callback
    }

    fn remove_context_callback(&mut self, id: CallbackId) -> bool {
        match self.context_dispatch.remove(&id) {
            Some(registration) => {
                debug!(
                    server_id = %registration.server.id(),
                    action = %registration.action,
                    callback = %id,
                    "Removed context callback"
                );
                true
            }
            None => false,
        }
    }

    /// Drop every dispatch callback of `mailbox`, on the transport too.
    fn purge_context_callbacks(&mut self, mailbox: MailboxId) {
        let ids: Vec<CallbackId> = self
            .context_dispatch
            .iter()
            .filter(|(_, registration)| registration.mailbox == mailbox)
            .map(|(id, _)| *id)
            .collect();

        for id in ids {
            if let Some(registration) = self.context_dispatch.remove(&id) {
                if let Err(e) = registration.server.remove_context_callback(id) {
                    debug!(callback = %id, error = %e, "Transport did not remove context callback");
                }
            }
        }
    }

    // ── Module lifecycle ─────────────────────────────────────────

    fn load_modules(&mut self, names: Option<Vec<String>>) -> AppResult<Vec<String>> {
        let names = match names {
            Some(names) => names,
            None => loader::discover(Path::new(&self.config.cfg_dir))?,
        };

        let mut loaded = Vec::new();
        for name in names {
            match self.load_module(&name) {
                Ok(()) => loaded.push(name),
                Err(e) => error!(module = %name, error = %e, "Failed to load module, skipping"),
            }
        }
        Ok(loaded)
    }

    fn load_module(&mut self, name: &str) -> AppResult<()> {
        if self.modules.contains_key(name) {
            warn!(module = %name, "Module already loaded");
            return Ok(());
        }

        let path = ModuleConfig::locate(Path::new(&self.config.cfg_dir), name).ok_or_else(|| {
            AppError::module_config_not_found(format!(
                "No configuration for module '{name}' in '{}'",
                self.config.cfg_dir
            ))
        })?;
        let config = ModuleConfig::load(&path).map_err(|e| {
            AppError::with_source(
                ErrorKind::ModuleInitFailed,
                format!("Configuration of module '{name}' is invalid: {e}"),
                e,
            )
        })?;

        let factory = match self.catalog.get(name) {
            Some(factory) => factory,
            None => self.imports.import(Path::new(&self.config.mod_dir), name)?,
        };

        self.instantiate(name, factory, config)
    }

    fn load_module_with(&mut self, name: &str, factory: ModuleFactory, config: ModuleConfig) -> AppResult<()> {
        if self.modules.contains_key(name) {
            warn!(module = %name, "Module already loaded");
            return Ok(());
        }
        self.instantiate(name, factory, config)
    }

    fn instantiate(&mut self, name: &str, factory: ModuleFactory, config: ModuleConfig) -> AppResult<()> {
        let mailbox: ModuleMailbox = Mailbox::new(name);
        let mut remote = ModuleRemote::new(name, mailbox.clone(), self.handle.clone());

        let module = match panic::catch_unwind(AssertUnwindSafe(|| factory(name, &mut remote, config))) {
            Ok(Ok(module)) => module,
            Ok(Err(e)) => {
                error!(module = %name, error = %e, "Module constructor failed");
                return Err(AppError::with_source(
                    ErrorKind::ModuleInitFailed,
                    format!("Module '{name}' failed to initialize: {e}"),
                    e,
                ));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(module = %name, panic = %message, "Module constructor panicked");
                return Err(AppError::module_init_failed(format!(
                    "Module '{name}' panicked during initialization: {message}"
                )));
            }
        };

        let deferred = remote.take_deferred();
        self.apply_deferred(&mailbox, deferred);

        let host = ModuleHost::new(module, remote);
        self.modules.insert(
            name.to_string(),
            LoadedModule {
                worker: Worker::with_mailbox(mailbox, host),
                loaded_at: Utc::now(),
            },
        );
        info!(module = %name, "Module loaded");
        Ok(())
    }

    /// Known names out of `names` (all loaded modules for `None`).
    fn select(&self, names: Option<Vec<String>>) -> Vec<String> {
        match names {
            None => self.modules.keys().cloned().collect(),
            Some(names) => names
                .into_iter()
                .filter(|name| {
                    let known = self.modules.contains_key(name);
                    if !known {
                        warn!(module = %name, "Module not loaded, skipping");
                    }
                    known
                })
                .collect(),
        }
    }

    fn start_modules(&mut self, names: Option<Vec<String>>) -> Vec<String> {
        let mut started = Vec::new();
        for name in self.select(names) {
            let Some(loaded) = self.modules.get_mut(&name) else {
                continue;
            };
            match loaded.worker.start() {
                Ok(()) => started.push(name),
                Err(e) => error!(module = %name, error = %e, "Failed to start module"),
            }
        }
        started
    }

    fn stop_modules(&mut self, names: Option<Vec<String>>, force: bool) -> Vec<String> {
        let names = self.select(names);
        for name in &names {
            if let Some(loaded) = self.modules.get_mut(name) {
                loaded.worker.stop(force);
            }
        }

        let timeout = self.config.stop_timeout();
        for name in &names {
            if let Some(loaded) = self.modules.get_mut(name) {
                if !loaded.worker.join(timeout) {
                    warn!(module = %name, "Module did not stop in time, leaving it behind");
                }
            }
        }
        names
    }

    fn unload_modules(&mut self, names: Option<Vec<String>>) -> Vec<String> {
        let names = self.select(names);
        let timeout = self.config.stop_timeout();

        for name in &names {
            let Some(mut loaded) = self.modules.remove(name) else {
                continue;
            };
            loaded.worker.stop(false);
            let stopped = loaded.worker.join(timeout);

            let mailbox = loaded.worker.mailbox().id();
            let removed = self.meta_callbacks.remove_mailbox(mailbox)
                + self.server_callbacks.remove_mailbox(mailbox)
                + self.context_callbacks.remove_mailbox(mailbox);
            self.purge_context_callbacks(mailbox);
            drop(loaded);

            // Code of an abandoned thread may still run from the library.
            if stopped {
                self.imports.release(name);
            }
            info!(module = %name, subscriptions = removed, "Module unloaded");
        }
        names
    }

    fn list_modules(&mut self) -> Vec<ModuleInfo> {
        self.modules
            .iter_mut()
            .map(|(name, loaded)| ModuleInfo {
                name: name.clone(),
                mailbox: loaded.worker.mailbox().id(),
                running: loaded.worker.is_running(),
                loaded_at: loaded.loaded_at,
            })
            .collect()
    }
}

impl Actor for ManagerState {
    fn on_start(&mut self) {
        info!(modules = self.modules.len(), "Manager started");
    }

    fn on_stop(&mut self) {
        info!(modules = self.modules.len(), "Manager stopped");
    }
}

/// Cloneable, thread-safe access to the manager.
///
/// Registry and query calls wait at most the configured `call_timeout`.
/// Lifecycle calls (load, start, stop, unload) wait without a deadline,
/// since they include module construction and thread joins.
#[derive(Clone)]
pub struct ManagerHandle {
    mailbox: Mailbox<ManagerState>,
    call_timeout: Option<Duration>,
}

impl ManagerHandle {
    fn query<R, F>(&self, f: F) -> AppResult<R>
    where
        F: FnOnce(&mut ManagerState) -> AppResult<R> + Send + 'static,
        R: Send + 'static,
    {
        self.mailbox.call_timeout(f, self.call_timeout)
    }

    /// The manager's mailbox.
    pub fn mailbox(&self) -> &Mailbox<ManagerState> {
        &self.mailbox
    }

    /// Register `key` of `mailbox` for `category` events of `scopes`.
    /// Returns how many registrations were new.
    pub fn subscribe(
        &self,
        category: Category,
        mailbox: &ModuleMailbox,
        key: HandlerKey,
        scopes: &[ServerScope],
    ) -> AppResult<usize> {
        let mailbox = mailbox.clone();
        let scopes = scopes.to_vec();
        self.query(move |state| Ok(state.subscribe(category, &mailbox, key, &scopes)))
    }

    /// Remove `key` of `mailbox` from `category` for `scopes`. Returns how
    /// many registrations existed.
    pub fn unsubscribe(
        &self,
        category: Category,
        mailbox: MailboxId,
        key: HandlerKey,
        scopes: &[ServerScope],
    ) -> AppResult<usize> {
        let scopes = scopes.to_vec();
        self.query(move |state| Ok(state.unsubscribe(category, mailbox, &key, &scopes)))
    }

    /// See [`ManagerHandle::subscribe`].
    pub fn subscribe_meta_callbacks(&self, mailbox: &ModuleMailbox, key: HandlerKey, scopes: &[ServerScope]) -> AppResult<()> {
        self.subscribe(Category::Meta, mailbox, key, scopes).map(|_| ())
    }

    /// See [`ManagerHandle::unsubscribe`].
    pub fn unsubscribe_meta_callbacks(&self, mailbox: MailboxId, key: HandlerKey, scopes: &[ServerScope]) -> AppResult<()> {
        self.unsubscribe(Category::Meta, mailbox, key, scopes).map(|_| ())
    }

    /// See [`ManagerHandle::subscribe`].
    pub fn subscribe_server_callbacks(&self, mailbox: &ModuleMailbox, key: HandlerKey, scopes: &[ServerScope]) -> AppResult<()> {
        self.subscribe(Category::Server, mailbox, key, scopes).map(|_| ())
    }

    /// See [`ManagerHandle::unsubscribe`].
    pub fn unsubscribe_server_callbacks(&self, mailbox: MailboxId, key: HandlerKey, scopes: &[ServerScope]) -> AppResult<()> {
        self.unsubscribe(Category::Server, mailbox, key, scopes).map(|_| ())
    }

    /// See [`ManagerHandle::subscribe`].
    pub fn subscribe_context_callbacks(&self, mailbox: &ModuleMailbox, key: HandlerKey, scopes: &[ServerScope]) -> AppResult<()> {
        self.subscribe(Category::Context, mailbox, key, scopes).map(|_| ())
    }

    /// See [`ManagerHandle::unsubscribe`].
    pub fn unsubscribe_context_callbacks(&self, mailbox: MailboxId, key: HandlerKey, scopes: &[ServerScope]) -> AppResult<()> {
        self.unsubscribe(Category::Context, mailbox, key, scopes).map(|_| ())
    }

    /// Fire-and-forget: remove `key` of `mailbox` from every scope.
    pub(crate) fn drop_subscription(&self, mailbox: MailboxId, category: Category, key: HandlerKey) {
        self.mailbox.cast(move |state| {
            state.registry(category).remove_key(mailbox, &key);
            Ok(())
        });
    }

    /// All registrations of `category`.
    pub fn list_subscriptions(&self, category: Category) -> AppResult<Vec<Subscription>> {
        self.query(move |state| Ok(state.registry(category).snapshot()))
    }

    /// Create a transport listener that forwards invocations of `action` on
    /// `server` to the module behind `mailbox`.
    pub fn create_context_callback(
        &self,
        mailbox: ModuleMailbox,
        server: Arc<dyn ServerProxy>,
        action: ActionId,
    ) -> AppResult<ContextCallback> {
        self.query(move |state| Ok(state.create_context_callback(mailbox, server, action)))
    }

    /// Forget a callback created by [`ManagerHandle::create_context_callback`].
    /// Returns whether it was known.
    pub fn remove_context_callback(&self, id: CallbackId) -> AppResult<bool> {
        self.query(move |state| Ok(state.remove_context_callback(id)))
    }

    /// Fire-and-forget variant of [`ManagerHandle::remove_context_callback`].
    pub(crate) fn release_context_callback(&self, id: CallbackId) {
        self.mailbox.cast(move |state| {
            state.remove_context_callback(id);
            Ok(())
        });
    }

    /// Number of live dispatch callbacks.
    pub fn context_callback_count(&self) -> AppResult<usize> {
        self.query(|state| Ok(state.context_dispatch.len()))
    }

    /// The voice server handle passed to the last `announce_connected`.
    pub fn meta(&self) -> AppResult<Option<Arc<dyn MetaProxy>>> {
        self.query(|state| Ok(state.meta.clone()))
    }

    /// Load the named modules, or every module enabled in the configuration
    /// directory. Failing modules are logged and skipped; returns the names
    /// that are loaded afterwards.
    pub fn load_modules(&self, names: Option<Vec<String>>) -> AppResult<Vec<String>> {
        self.mailbox.call(move |state| state.load_modules(names))
    }

    /// Load one module by name.
    pub fn load_module(&self, name: &str) -> AppResult<()> {
        let name = name.to_string();
        self.mailbox.call(move |state| state.load_module(&name))
    }

    /// Load a module from an explicit factory and configuration.
    pub fn load_module_with(&self, name: &str, factory: ModuleFactory, config: ModuleConfig) -> AppResult<()> {
        let name = name.to_string();
        self.mailbox.call(move |state| state.load_module_with(&name, factory, config))
    }

    /// Start the named (or all) module threads. Returns the modules running
    /// afterwards.
    pub fn start_modules(&self, names: Option<Vec<String>>) -> AppResult<Vec<String>> {
        self.mailbox.call(move |state| Ok(state.start_modules(names)))
    }

    /// Stop the named (or all) module threads, waiting up to the configured
    /// timeout for each. With `force`, queued messages are discarded first.
    pub fn stop_modules(&self, names: Option<Vec<String>>, force: bool) -> AppResult<Vec<String>> {
        self.mailbox.call(move |state| Ok(state.stop_modules(names, force)))
    }

    /// Stop and remove the named (or all) modules with their registrations.
    pub fn unload_modules(&self, names: Option<Vec<String>>) -> AppResult<Vec<String>> {
        self.mailbox.call(move |state| Ok(state.unload_modules(names)))
    }

    /// Loaded modules, by name.
    pub fn list_modules(&self) -> AppResult<Vec<ModuleInfo>> {
        self.query(|state| Ok(state.list_modules()))
    }

    /// Fire-and-forget: deliver a meta event to its subscribers.
    pub fn announce_meta(&self, server: Arc<dyn ServerProxy>, event: MetaEvent) {
        self.mailbox.cast(move |state| {
            state.announce_meta(server, event);
            Ok(())
        });
    }

    /// Fire-and-forget: deliver a server event to its subscribers.
    pub fn announce_server(&self, server: Arc<dyn ServerProxy>, event: ServerEvent) {
        self.mailbox.cast(move |state| {
            state.announce_server(server, event);
            Ok(())
        });
    }

    /// Fire-and-forget: deliver a context event to its subscribers.
    pub fn announce_context(&self, server: Arc<dyn ServerProxy>, event: ContextEvent) {
        self.mailbox.cast(move |state| {
            state.announce_context(server, event);
            Ok(())
        });
    }

    /// Fire-and-forget: tell every loaded module the connection is up.
    pub fn announce_connected(&self, meta: Arc<dyn MetaProxy>) {
        self.mailbox.cast(move |state| {
            state.announce_connected(meta);
            Ok(())
        });
    }

    /// Fire-and-forget: tell every loaded module the connection is gone.
    pub fn announce_disconnected(&self) {
        self.mailbox.cast(|state| {
            state.announce_disconnected();
            Ok(())
        });
    }
}

impl fmt::Debug for ManagerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerHandle")
            .field("mailbox", &self.mailbox.id())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

/// Owner of the manager thread.
pub struct Manager {
    worker: Worker<ManagerState>,
    handle: ManagerHandle,
    stop_timeout: Duration,
}

impl Manager {
    /// Create an idle manager. Call [`Manager::start`] before using the handle.
    pub fn new(config: ModulesConfig, catalog: ModuleCatalog) -> Self {
        let mailbox = Mailbox::new("manager");
        let handle = ManagerHandle {
            mailbox: mailbox.clone(),
            call_timeout: config.call_timeout(),
        };
        let stop_timeout = config.stop_timeout();
        let state = ManagerState::new(config, catalog, handle.clone());

        Self {
            worker: Worker::with_mailbox(mailbox, state),
            handle,
            stop_timeout,
        }
    }

    /// Spawn the manager thread.
    pub fn start(&mut self) -> AppResult<()> {
        self.worker.start()
    }

    /// A handle for other threads.
    pub fn handle(&self) -> ManagerHandle {
        self.handle.clone()
    }

    /// Whether the manager thread is alive.
    pub fn is_running(&mut self) -> bool {
        self.worker.is_running()
    }

    /// Stop every module, then the manager itself.
    ///
    /// Returns `false` if the manager thread did not exit in time.
    pub fn shutdown(&mut self, force: bool) -> bool {
        if !self.worker.is_running() {
            return true;
        }
        match self.handle.stop_modules(None, force) {
            Ok(stopped) => info!(modules = stopped.len(), "Modules stopped"),
            Err(e) => error!(error = %e, "Failed to stop modules"),
        }
        self.worker.stop(false);
        self.worker.join(self.stop_timeout)
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("worker", &self.worker)
            .field("stop_timeout", &self.stop_timeout)
            .finish()
    }
}
