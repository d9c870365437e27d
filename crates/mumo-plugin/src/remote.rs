//! Module facade: the only handle a module gets on the manager.
//!
//! Subscriptions are forwarded to the manager with the module's own
//! mailbox filled in. Context menu entries are tracked here, per module,
//! because only the module knows which of its handlers an entry belongs to.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use mumo_core::error::AppError;
use mumo_core::result::AppResult;
use mumo_core::types::{ActionId, HandlerKey, ServerId, ServerScope, SessionId};
use mumo_transport::{ContextMask, MetaProxy, ServerProxy, User};

use crate::manager::ManagerHandle;
use crate::menu::{ActionRoute, ContextMenuState};
use crate::module::ModuleMailbox;
use crate::registry::Category;

/// A subscription change requested while the module was being constructed.
#[derive(Debug, Clone)]
pub(crate) struct Deferred {
    pub category: Category,
    pub key: HandlerKey,
    pub scopes: Vec<ServerScope>,
    pub subscribe: bool,
}

/// Handle a module uses to talk to the manager.
pub struct ModuleRemote {
    name: String,
    mailbox: ModuleMailbox,
    manager: ManagerHandle,
    menu: ContextMenuState,
    /// `Some` while the factory runs on the manager thread. A blocking call
    /// to the manager from there would wait on itself, so subscription
    /// changes are queued and applied once the factory returns.
    deferred: Option<Vec<Deferred>>,
}

impl ModuleRemote {
    pub(crate) fn new(name: impl Into<String>, mailbox: ModuleMailbox, manager: ManagerHandle) -> Self {
        Self {
            name: name.into(),
            mailbox,
            manager,
            menu: ContextMenuState::new(),
            deferred: Some(Vec::new()),
        }
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The module's own mailbox.
    pub fn mailbox(&self) -> &ModuleMailbox {
        &self.mailbox
    }

    /// The manager this module is registered with.
    pub fn manager(&self) -> &ManagerHandle {
        &self.manager
    }

    /// The module's context menu routes.
    pub fn menu(&self) -> &ContextMenuState {
        &self.menu
    }

    /// Receive `started`/`stopped` of the given servers on `key`.
    pub fn subscribe_meta_callbacks(&mut self, key: HandlerKey, scopes: &[ServerScope]) -> AppResult<()> {
        self.change(Category::Meta, key, scopes, true)
    }

    /// Stop receiving meta callbacks of the given servers on `key`.
    pub fn unsubscribe_meta_callbacks(&mut self, key: HandlerKey, scopes: &[ServerScope]) -> AppResult<()> {
        self.change(Category::Meta, key, scopes, false)
    }

    /// Receive user and channel events of the given servers on `key`.
    pub fn subscribe_server_callbacks(&mut self, key: HandlerKey, scopes: &[ServerScope]) -> AppResult<()> {
        self.change(Category::Server, key, scopes, true)
    }

    /// Stop receiving server callbacks of the given servers on `key`.
    pub fn unsubscribe_server_callbacks(&mut self, key: HandlerKey, scopes: &[ServerScope]) -> AppResult<()> {
        self.change(Category::Server, key, scopes, false)
    }

    /// Receive server-wide context actions of the given servers on `key`.
    pub fn subscribe_context_callbacks(&mut self, key: HandlerKey, scopes: &[ServerScope]) -> AppResult<()> {
        self.change(Category::Context, key, scopes, true)
    }

    /// Stop receiving context callbacks of the given servers on `key`.
    pub fn unsubscribe_context_callbacks(&mut self, key: HandlerKey, scopes: &[ServerScope]) -> AppResult<()> {
        self.change(Category::Context, key, scopes, false)
    }

    /// The voice server handle, while connected.
    pub fn meta(&self) -> AppResult<Option<Arc<dyn MetaProxy>>> {
        self.ensure_constructed("meta")?;
        self.manager.meta()
    }

    /// A fresh action id, unique to this process.
    pub fn unique_action(&self) -> ActionId {
        ActionId::unique(&self.name)
    }

    /// Add `action` to `user`'s context menu, routed to `handler`.
    ///
    /// The first entry for (server, action) registers a dispatch callback;
    /// later entries for other users share it.
    pub fn add_context_menu_entry(
        &mut self,
        server: &Arc<dyn ServerProxy>,
        user: &User,
        action: &ActionId,
        text: &str,
        handler: HandlerKey,
        mask: ContextMask,
    ) -> AppResult<()> {
        self.ensure_constructed("add_context_menu_entry")?;
        let server_id = server.id();

        let created = match self.menu.callback(server_id, action) {
            Some(_) => false,
            None => {
                let callback = self.manager.create_context_callback(
                    self.mailbox.clone(),
                    Arc::clone(server),
                    action.clone(),
                )?;
                self.menu.insert_route(Arc::clone(server), action.clone(), callback);
                true
            }
        };

        let callback = self.menu.callback(server_id, action).ok_or_else(|| {
            AppError::internal(format!("Route for '{action}' on server {server_id} vanished"))
        })?;

        match server.add_context_callback(user.session, action, text, callback, mask) {
            Ok(()) => {
                self.menu.add_session(server_id, action, user.session, handler);
                debug!(
                    module = %self.name,
                    server_id = %server_id,
                    session = %user.session,
                    action = %action,
                    "Added context menu entry"
                );
                Ok(())
            }
            Err(e) => {
                if created {
                    if let Some(route) = self.menu.remove_action(server_id, action) {
                        self.release(route);
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Remove one user's entry. The dispatch callback stays registered
    /// while other users still carry the action.
    pub fn remove_user_context_menu_entry(
        &mut self,
        server: ServerId,
        session: SessionId,
        action: &ActionId,
    ) -> AppResult<()> {
        if let Some(route) = self.menu.remove_session(server, action, session) {
            self.release(route);
        }
        Ok(())
    }

    /// Remove `action` from every user's menu on `server`.
    pub fn remove_context_menu_entry(&mut self, server: ServerId, action: &ActionId) -> AppResult<()> {
        match self.menu.remove_action(server, action) {
            Some(route) => {
                self.release(route);
                Ok(())
            }
            None => {
                debug!(module = %self.name, server_id = %server, action = %action, "No such context menu entry");
                Ok(())
            }
        }
    }

    pub(crate) fn forget_session(&mut self, server: ServerId, session: SessionId) {
        for route in self.menu.forget_session(server, session) {
            self.release(route);
        }
    }

    pub(crate) fn forget_server(&mut self, server: ServerId) {
        for route in self.menu.forget_server(server) {
            self.release(route);
        }
    }

    /// Subscription changes queued during construction.
    pub(crate) fn take_deferred(&mut self) -> Vec<Deferred> {
        self.deferred.take().unwrap_or_default()
    }

    pub(crate) fn finish_construction(&mut self) {
        self.deferred = None;
    }

    fn change(
        &mut self,
        category: Category,
        key: HandlerKey,
        scopes: &[ServerScope],
        subscribe: bool,
    ) -> AppResult<()> {
        if let Some(deferred) = self.deferred.as_mut() {
            deferred.push(Deferred {
                category,
                key,
                scopes: scopes.to_vec(),
                subscribe,
            });
            return Ok(());
        }

        if subscribe {
            self.manager.subscribe(category, &self.mailbox, key, scopes)?;
        } else {
            self.manager.unsubscribe(category, self.mailbox.id(), key, scopes)?;
        }
        Ok(())
    }

    /// Unregister an emptied route from the transport and the manager.
    fn release(&self, route: ActionRoute) {
        let id = route.callback.id;
        if let Err(e) = route.server.remove_context_callback(id) {
            // A stopped server already dropped its entries.
            debug!(
                module = %self.name,
                server_id = %route.server.id(),
                error = %e,
                "Transport did not remove context callback"
            );
        }
        // The manager may be busy stopping this module; never wait on it here.
        self.manager.release_context_callback(id);
    }

    fn ensure_constructed(&self, operation: &str) -> AppResult<()> {
        if self.deferred.is_some() {
            warn!(module = %self.name, operation, "Called during module construction");
            return Err(AppError::conflict(format!(
                "'{operation}' is not available while module '{}' is being constructed",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ModuleRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRemote")
            .field("name", &self.name)
            .field("mailbox", &self.mailbox.id())
            .field("routes", &self.menu.route_count())
            .finish()
    }
}
