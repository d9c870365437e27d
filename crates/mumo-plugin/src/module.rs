//! Module contract and the actor state every module thread runs.

use std::sync::Arc;

use tracing::{debug, error, info};

use mumo_core::error::AppError;
use mumo_core::result::AppResult;
use mumo_core::types::{ActionId, ChannelId, HandlerKey, ServerId, SessionId};
use mumo_transport::{ContextTarget, ServerProxy, User};
use mumo_worker::{Actor, Mailbox};

use crate::events::{ContextEvent, MetaEvent, ServerEvent};
use crate::handlers::{ContextCallbacks, ContextMenuHandler, MetaCallbacks, ServerCallbacks};
use crate::registry::Category;
use crate::remote::ModuleRemote;

/// Mailbox of a module thread.
pub type ModuleMailbox = Mailbox<ModuleHost>;

/// A plugin module.
///
/// All methods run on the module's own thread. A module receives the
/// events of a category only for the handler keys it resolves through the
/// matching `*_handler` method; most modules answer [`HandlerKey::module`]
/// with `Some(self)`.
#[allow(unused_variables)]
pub trait Module: Send + 'static {
    /// The module thread started.
    fn on_start(&mut self, remote: &mut ModuleRemote) -> AppResult<()> {
        Ok(())
    }

    /// The module thread is about to exit.
    fn on_stop(&mut self, remote: &mut ModuleRemote) -> AppResult<()> {
        Ok(())
    }

    /// The voice server connection is (re-)established.
    fn connected(&mut self, remote: &mut ModuleRemote) -> AppResult<()>;

    /// The voice server connection was lost.
    fn disconnected(&mut self, remote: &mut ModuleRemote) -> AppResult<()>;

    /// Resolve a meta callback handler.
    fn meta_handler(&mut self, key: &HandlerKey) -> Option<&mut dyn MetaCallbacks> {
        None
    }

    /// Resolve a server callback handler.
    fn server_handler(&mut self, key: &HandlerKey) -> Option<&mut dyn ServerCallbacks> {
        None
    }

    /// Resolve a context callback handler.
    fn context_handler(&mut self, key: &HandlerKey) -> Option<&mut dyn ContextCallbacks> {
        None
    }

    /// Resolve the handler of context menu entries added with `key`.
    fn menu_handler(&mut self, key: &HandlerKey) -> Option<&mut dyn ContextMenuHandler> {
        None
    }
}

/// Actor state of a module thread: the module and its facade.
pub struct ModuleHost {
    module: Box<dyn Module>,
    remote: ModuleRemote,
}

impl ModuleHost {
    pub(crate) fn new(module: Box<dyn Module>, mut remote: ModuleRemote) -> Self {
        remote.finish_construction();
        Self { module, remote }
    }

    /// Module name.
    pub fn name(&self) -> &str {
        self.remote.name()
    }

    /// The module's facade.
    pub fn remote(&self) -> &ModuleRemote {
        &self.remote
    }

    pub(crate) fn connected(&mut self) -> AppResult<()> {
        self.module.connected(&mut self.remote)
    }

    pub(crate) fn disconnected(&mut self) -> AppResult<()> {
        self.module.disconnected(&mut self.remote)
    }

    pub(crate) fn deliver_meta(
        &mut self,
        key: &HandlerKey,
        server: &Arc<dyn ServerProxy>,
        event: &MetaEvent,
    ) -> AppResult<()> {
        let Self { module, remote } = self;
        let handler = module
            .meta_handler(key)
            .ok_or_else(|| missing(remote.name(), Category::Meta, key, event.name()))?;

        match event {
            MetaEvent::Started => handler.started(remote, server),
            MetaEvent::Stopped => handler.stopped(remote, server),
        }
    }

    pub(crate) fn deliver_server(
        &mut self,
        key: &HandlerKey,
        server: &Arc<dyn ServerProxy>,
        event: &ServerEvent,
    ) -> AppResult<()> {
        let Self { module, remote } = self;
        let handler = module
            .server_handler(key)
            .ok_or_else(|| missing(remote.name(), Category::Server, key, event.name()))?;

        match event {
            ServerEvent::UserConnected(user) => handler.user_connected(remote, server, user),
            ServerEvent::UserDisconnected(user) => handler.user_disconnected(remote, server, user),
            ServerEvent::UserStateChanged(user) => handler.user_state_changed(remote, server, user),
            ServerEvent::UserTextMessage(user, message) => {
                handler.user_text_message(remote, server, user, message)
            }
            ServerEvent::ChannelCreated(channel) => handler.channel_created(remote, server, channel),
            ServerEvent::ChannelRemoved(channel) => handler.channel_removed(remote, server, channel),
            ServerEvent::ChannelStateChanged(channel) => {
                handler.channel_state_changed(remote, server, channel)
            }
        }
    }

    pub(crate) fn deliver_context(
        &mut self,
        key: &HandlerKey,
        server: &Arc<dyn ServerProxy>,
        event: &ContextEvent,
    ) -> AppResult<()> {
        let Self { module, remote } = self;
        let handler = module
            .context_handler(key)
            .ok_or_else(|| missing(remote.name(), Category::Context, key, event.name()))?;

        match event {
            ContextEvent::Action {
                action,
                user,
                session,
                channel,
            } => handler.context_action(remote, server, action, user, *session, *channel),
        }
    }

    /// Route a context menu invocation to the handler registered for the
    /// invoking user's session.
    pub(crate) fn dispatch_menu_action(
        &mut self,
        server_id: ServerId,
        action: &ActionId,
        user: &User,
        session: Option<SessionId>,
        channel: Option<ChannelId>,
    ) -> AppResult<()> {
        let Self { module, remote } = self;
        let Some((server, key)) = remote.menu().resolve(server_id, action, user.session) else {
            debug!(
                module = %remote.name(),
                server_id = %server_id,
                action = %action,
                session = %user.session,
                "No menu route for invocation, ignoring"
            );
            return Ok(());
        };

        let target = match (session, channel) {
            (Some(session), _) => ContextTarget::User(server.user(session)?),
            (None, Some(channel)) => ContextTarget::Channel(server.channel(channel)?),
            (None, None) => ContextTarget::None,
        };

        let handler = module
            .menu_handler(&key)
            .ok_or_else(|| missing(remote.name(), Category::Context, &key, "on_action"))?;
        handler.on_action(remote, &server, action, user, &target)
    }

    /// Subscribe-time probe: drop a registration the module cannot handle.
    pub(crate) fn verify_handler(&mut self, category: Category, key: &HandlerKey) -> AppResult<()> {
        let handled = match category {
            Category::Meta => self.module.meta_handler(key).is_some(),
            Category::Server => self.module.server_handler(key).is_some(),
            Category::Context => self.module.context_handler(key).is_some(),
        };
        if handled {
            return Ok(());
        }

        let err = missing(self.name(), category, key, "subscription");
        error!(module = %self.name(), error = %err, "Dropping unhandled subscription");
        self.remote.manager().drop_subscription(self.remote.mailbox().id(), category, key.clone());
        Ok(())
    }

    pub(crate) fn forget_session(&mut self, server: ServerId, session: SessionId) -> AppResult<()> {
        self.remote.forget_session(server, session);
        Ok(())
    }

    pub(crate) fn forget_server(&mut self, server: ServerId) -> AppResult<()> {
        self.remote.forget_server(server);
        Ok(())
    }
}

impl Actor for ModuleHost {
    fn on_start(&mut self) {
        info!(module = %self.name(), "Start");
        if let Err(e) = self.module.on_start(&mut self.remote) {
            error!(module = %self.name(), error = %e, "Module start hook failed");
        }
    }

    fn on_stop(&mut self) {
        if let Err(e) = self.module.on_stop(&mut self.remote) {
            error!(module = %self.name(), error = %e, "Module stop hook failed");
        }
        info!(module = %self.name(), "Stop");
    }
}

fn missing(module: &str, category: Category, key: &HandlerKey, event: &str) -> AppError {
    AppError::handler_not_found(format!(
        "Module '{module}' has no {category} handler '{key}' for '{event}'"
    ))
}
