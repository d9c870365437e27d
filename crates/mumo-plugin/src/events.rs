//! Events fanned out to subscribed modules.

use mumo_core::types::{ActionId, ChannelId, SessionId};
use mumo_transport::{Channel, TextMessage, User};

/// Virtual server lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaEvent {
    /// The server was started.
    Started,
    /// The server was stopped.
    Stopped,
}

impl MetaEvent {
    /// Callback name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Stopped => "stopped",
        }
    }
}

/// State changes within one virtual server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A user connected.
    UserConnected(User),
    /// A user disconnected.
    UserDisconnected(User),
    /// A user's state changed.
    UserStateChanged(User),
    /// A user sent a text message.
    UserTextMessage(User, TextMessage),
    /// A channel was created.
    ChannelCreated(Channel),
    /// A channel was removed.
    ChannelRemoved(Channel),
    /// A channel's state changed.
    ChannelStateChanged(Channel),
}

impl ServerEvent {
    /// Callback name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserConnected(_) => "user_connected",
            Self::UserDisconnected(_) => "user_disconnected",
            Self::UserStateChanged(_) => "user_state_changed",
            Self::UserTextMessage(..) => "user_text_message",
            Self::ChannelCreated(_) => "channel_created",
            Self::ChannelRemoved(_) => "channel_removed",
            Self::ChannelStateChanged(_) => "channel_state_changed",
        }
    }
}

/// Context menu invocations reported server-wide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEvent {
    /// `user` invoked `action` on a session, a channel, or the server.
    Action {
        /// Invoked action.
        action: ActionId,
        /// Invoking user.
        user: User,
        /// Target session, if invoked on a user.
        session: Option<SessionId>,
        /// Target channel, if invoked on a channel.
        channel: Option<ChannelId>,
    },
}

impl ContextEvent {
    /// Callback name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Action { .. } => "context_action",
        }
    }
}
