//! Proxy handles and listener traits.
//!
//! Proxies are how modules and the moderator issue commands to the voice
//! server. Listeners are how the transport reports events back; it may
//! invoke them on any thread it likes.

use std::fmt;
use std::sync::Arc;

use mumo_core::types::{ActionId, CallbackId, ChannelId, ServerId, SessionId};

use crate::error::TransportResult;
use crate::types::{Channel, ContextMask, TextMessage, User};

/// Receives virtual server lifecycle events.
pub trait MetaListener: Send + Sync {
    /// A virtual server was started.
    fn started(&self, server: Arc<dyn ServerProxy>);

    /// A virtual server was stopped.
    fn stopped(&self, server: Arc<dyn ServerProxy>);
}

/// Receives state changes of one virtual server.
pub trait ServerListener: Send + Sync {
    /// A user connected.
    fn user_connected(&self, user: &User);
    /// A user disconnected.
    fn user_disconnected(&self, user: &User);
    /// A user's state changed (moved, muted, ...).
    fn user_state_changed(&self, user: &User);
    /// A user sent a text message.
    fn user_text_message(&self, user: &User, message: &TextMessage);
    /// A channel was created.
    fn channel_created(&self, channel: &Channel);
    /// A channel was removed.
    fn channel_removed(&self, channel: &Channel);
    /// A channel's state changed.
    fn channel_state_changed(&self, channel: &Channel);
}

/// Receives context menu invocations.
pub trait ContextListener: Send + Sync {
    /// `user` invoked `action` on the target session or channel. Both are
    /// `None` when the action was invoked on the server itself.
    fn context_action(
        &self,
        action: &ActionId,
        user: &User,
        session: Option<SessionId>,
        channel: Option<ChannelId>,
    );
}

/// A context listener together with the identity used to remove it again.
#[derive(Clone)]
pub struct ContextCallback {
    /// Identity of the registration.
    pub id: CallbackId,
    /// The listener invoked by the transport.
    pub listener: Arc<dyn ContextListener>,
}

impl ContextCallback {
    /// Wrap a listener with a fresh identity.
    pub fn new(listener: Arc<dyn ContextListener>) -> Self {
        Self {
            id: CallbackId::new(),
            listener,
        }
    }
}

impl fmt::Debug for ContextCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextCallback").field("id", &self.id).finish()
    }
}

/// Handle on the voice server process.
pub trait MetaProxy: Send + Sync {
    /// All currently running virtual servers.
    fn booted_servers(&self) -> TransportResult<Vec<Arc<dyn ServerProxy>>>;

    /// One virtual server by id, running or not.
    fn server(&self, id: ServerId) -> TransportResult<Option<Arc<dyn ServerProxy>>>;

    /// Seconds the voice server process has been running.
    fn uptime(&self) -> TransportResult<u64>;

    /// Register a lifecycle listener.
    fn add_callback(&self, listener: Arc<dyn MetaListener>) -> TransportResult<()>;
}

/// Handle on one virtual server.
pub trait ServerProxy: Send + Sync {
    /// Virtual server id.
    fn id(&self) -> ServerId;

    /// Whether the server is running.
    fn is_running(&self) -> TransportResult<bool>;

    /// All connected users.
    fn users(&self) -> TransportResult<Vec<User>>;

    /// One connected user by session.
    fn user(&self, session: SessionId) -> TransportResult<User>;

    /// All channels.
    fn channels(&self) -> TransportResult<Vec<Channel>>;

    /// One channel by id.
    fn channel(&self, id: ChannelId) -> TransportResult<Channel>;

    /// Apply a user's state (moving them if `channel` changed).
    fn set_state(&self, user: &User) -> TransportResult<()>;

    /// Send a text message to one session.
    fn send_message(&self, session: SessionId, text: &str) -> TransportResult<()>;

    /// Register a server listener.
    fn add_callback(&self, listener: Arc<dyn ServerListener>) -> TransportResult<()>;

    /// Add a context menu entry for one user.
    fn add_context_callback(
        &self,
        session: SessionId,
        action: &ActionId,
        text: &str,
        callback: ContextCallback,
        mask: ContextMask,
    ) -> TransportResult<()>;

    /// Remove every menu entry registered with `callback`.
    fn remove_context_callback(&self, callback: CallbackId) -> TransportResult<()>;
}
