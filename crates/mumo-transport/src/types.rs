//! Data exchanged with the voice server.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use mumo_core::types::{ChannelId, SessionId};

/// State of a connected user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Session number, unique while connected.
    pub session: SessionId,
    /// Registered user id, or -1 for anonymous users.
    pub user_id: i32,
    /// Display name.
    pub name: String,
    /// Current channel.
    pub channel: ChannelId,
    /// Muted by an admin.
    pub mute: bool,
    /// Deafened by an admin.
    pub deaf: bool,
    /// Muted by the user.
    pub self_mute: bool,
    /// Deafened by the user.
    pub self_deaf: bool,
    /// Seconds since the user connected.
    pub online_secs: u64,
    /// Seconds since the user last sent audio or text.
    pub idle_secs: u64,
    /// Free-form user comment.
    pub comment: String,
}

impl User {
    /// A user with default flags in `channel`.
    pub fn new(session: SessionId, name: impl Into<String>, channel: ChannelId) -> Self {
        Self {
            session,
            user_id: -1,
            name: name.into(),
            channel,
            mute: false,
            deaf: false,
            self_mute: false,
            self_deaf: false,
            online_secs: 0,
            idle_secs: 0,
            comment: String::new(),
        }
    }
}

/// State of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel id, the root channel is 0.
    pub id: ChannelId,
    /// Display name.
    pub name: String,
    /// Parent channel, `None` for the root.
    pub parent: Option<ChannelId>,
    /// Linked channels.
    pub links: Vec<ChannelId>,
    /// Channel description.
    pub description: String,
    /// Temporary channels vanish when empty.
    pub temporary: bool,
    /// Sort position among siblings.
    pub position: i32,
}

impl Channel {
    /// A permanent channel with no links.
    pub fn new(id: ChannelId, name: impl Into<String>, parent: Option<ChannelId>) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
            links: Vec::new(),
            description: String::new(),
            temporary: false,
            position: 0,
        }
    }
}

/// A text message as sent by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    /// Sessions addressed directly.
    pub sessions: Vec<SessionId>,
    /// Channels addressed.
    pub channels: Vec<ChannelId>,
    /// Channels addressed including their subchannels.
    pub trees: Vec<ChannelId>,
    /// Message body.
    pub text: String,
}

/// Where a context menu entry is shown in the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextMask(u8);

impl ContextMask {
    /// On the server root.
    pub const SERVER: Self = Self(0x01);
    /// On channels.
    pub const CHANNEL: Self = Self(0x02);
    /// On users.
    pub const USER: Self = Self(0x04);

    /// Raw bit value as understood by the voice server.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether all bits of `other` are set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ContextMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ContextMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// What a context menu action was invoked on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextTarget {
    /// Invoked on the server itself, or the target vanished.
    None,
    /// Invoked on a user.
    User(User),
    /// Invoked on a channel.
    Channel(Channel),
}

impl fmt::Display for ContextTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "server"),
            Self::User(user) => write!(f, "user '{}' (session {})", user.name, user.session),
            Self::Channel(channel) => write!(f, "channel '{}' ({})", channel.name, channel.id),
        }
    }
}
