//! Transport listeners that hand events to the manager or to a module.
//!
//! The transport calls these on its own threads. They only enqueue work,
//! and a panic never unwinds back into the transport.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info};

use mumo_core::config::MurmurConfig;
use mumo_core::types::{ActionId, ChannelId, ServerId, SessionId};
use mumo_transport::{
    Channel, ContextListener, MetaListener, ServerListener, ServerProxy, TextMessage, User,
};
use mumo_worker::panic_message;

use crate::events::{ContextEvent, MetaEvent, ServerEvent};
use crate::manager::ManagerHandle;
use crate::module::ModuleMailbox;

/// Run a listener body, logging a panic instead of propagating it.
fn fortify(listener: &str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        error!(
            listener,
            panic = %panic_message(payload.as_ref()),
            "Unexpected panic caught in transport listener"
        );
    }
}

/// Forwards virtual server start/stop and attaches server listeners to
/// newly started servers that pass the server filter.
pub struct MetaForwarder {
    manager: ManagerHandle,
    murmur: MurmurConfig,
    connected: Arc<AtomicBool>,
}

impl MetaForwarder {
    /// `connected` is shared with the connection supervisor.
    pub fn new(manager: ManagerHandle, murmur: MurmurConfig, connected: Arc<AtomicBool>) -> Self {
        Self {
            manager,
            murmur,
            connected,
        }
    }
}

impl MetaListener for MetaForwarder {
    fn started(&self, server: Arc<dyn ServerProxy>) {
        fortify("meta", || {
            let server_id = server.id();
            if self.murmur.includes(server_id) {
                info!(server_id = %server_id, "Setting callbacks for virtual server");
                let listener = Arc::new(ServerForwarder::new(self.manager.clone(), Arc::clone(&server)));
                if let Err(e) = server.add_callback(listener) {
                    error!(server_id = %server_id, error = %e, "Failed to attach server callbacks");
                    return;
                }
            } else {
                debug!(server_id = %server_id, "Virtual server got started");
            }
            self.manager.announce_meta(server, MetaEvent::Started);
        });
    }

    fn stopped(&self, server: Arc<dyn ServerProxy>) {
        fortify("meta", || {
            if !self.connected.load(Ordering::SeqCst) {
                debug!("Server shutdown stopped a virtual server");
                return;
            }
            let server_id = server.id();
            if self.murmur.includes(server_id) {
                info!(server_id = %server_id, "Watched virtual server got stopped");
            } else {
                debug!(server_id = %server_id, "Virtual server got stopped");
            }
            self.manager.announce_meta(server, MetaEvent::Stopped);
        });
    }
}

/// Forwards the state changes of one virtual server.
pub struct ServerForwarder {
    manager: ManagerHandle,
    server: Arc<dyn ServerProxy>,
}

impl ServerForwarder {
    /// Forward events of `server`.
    pub fn new(manager: ManagerHandle, server: Arc<dyn ServerProxy>) -> Self {
        Self { manager, server }
    }

    fn forward(&self, event: ServerEvent) {
        fortify("server", || {
            self.manager.announce_server(Arc::clone(&self.server), event);
        });
    }
}

impl ServerListener for ServerForwarder {
    fn user_connected(&self, user: &User) {
        self.forward(ServerEvent::UserConnected(user.clone()));
    }

    fn user_disconnected(&self, user: &User) {
        self.forward(ServerEvent::UserDisconnected(user.clone()));
    }

    fn user_state_changed(&self, user: &User) {
        self.forward(ServerEvent::UserStateChanged(user.clone()));
    }

    fn user_text_message(&self, user: &User, message: &TextMessage) {
        self.forward(ServerEvent::UserTextMessage(user.clone(), message.clone()));
    }

    fn channel_created(&self, channel: &Channel) {
        self.forward(ServerEvent::ChannelCreated(channel.clone()));
    }

    fn channel_removed(&self, channel: &Channel) {
        self.forward(ServerEvent::ChannelRemoved(channel.clone()));
    }

    fn channel_state_changed(&self, channel: &Channel) {
        self.forward(ServerEvent::ChannelStateChanged(channel.clone()));
    }
}

/// Forwards server-wide context actions of one virtual server to the
/// context subscribers, for transports that report them.
///
/// A transport that reports them builds one per watched server with
/// `ContextForwarder::new(handle.clone(), Arc::clone(&server))` and calls its
/// [`ContextListener::context_action`] for each action it receives.
pub struct ContextForwarder {
    manager: ManagerHandle,
    server: Arc<dyn ServerProxy>,
}

impl ContextForwarder {
    /// Forward context actions of `server`.
    pub fn new(manager: ManagerHandle, server: Arc<dyn ServerProxy>) -> Self {
        Self { manager, server }
    }
}

impl ContextListener for ContextForwarder {
    fn context_action(
        &self,
        action: &ActionId,
        user: &User,
        session: Option<SessionId>,
        channel: Option<ChannelId>,
    ) {
        fortify("context", || {
            self.manager.announce_context(
                Arc::clone(&self.server),
                ContextEvent::Action {
                    action: action.clone(),
                    user: user.clone(),
                    session,
                    channel,
                },
            );
        });
    }
}

/// Dispatch callback behind a module's context menu entries: hands each
/// invocation to the owning module's thread.
pub struct MenuForwarder {
    mailbox: ModuleMailbox,
    server: ServerId,
}

impl MenuForwarder {
    /// Dispatch invocations on `server` to the module behind `mailbox`.
    pub fn new(mailbox: ModuleMailbox, server: ServerId) -> Self {
        Self { mailbox, server }
    }
}

impl ContextListener for MenuForwarder {
    fn context_action(
        &self,
        action: &ActionId,
        user: &User,
        session: Option<SessionId>,
        channel: Option<ChannelId>,
    ) {
        let server = self.server;
        let action = action.clone();
        let user = user.clone();
        fortify("menu", || {
            self.mailbox.cast(move |host| {
                host.dispatch_menu_action(server, &action, &user, session, channel)
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fortify_swallows_panics() {
        let mut reached = false;
        fortify("test", || reached = true);
        assert!(reached);
        fortify("test", || panic!("listener blew up"));
    }
}
