//! Newtype identifiers used across the moderator.
//!
//! Voice-server side identifiers (`ServerId`, `SessionId`, `ChannelId`)
//! wrap the integers the server hands out. Host side identifiers
//! (`MailboxId`, `CallbackId`) are random UUIDs minted locally.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a newtype ID wrapper around `Uuid`.
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Return the inner UUID value.
            pub fn into_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

/// Macro to define a newtype ID wrapper around a server-assigned integer.
macro_rules! define_int_id {
    (
        $(#[$meta:meta])*
        $name:ident($inner:ty)
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Return the raw integer value.
            pub fn get(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<$inner>().map(Self)
            }
        }
    };
}

define_uuid_id!(
    /// Identity of an actor's message queue.
    MailboxId
);

define_uuid_id!(
    /// Identity of a transport-level context action listener.
    CallbackId
);

define_int_id!(
    /// Identifier of a virtual server on the voice server.
    ServerId(i32)
);

define_int_id!(
    /// Session number of a connected user.
    SessionId(u32)
);

define_int_id!(
    /// Identifier of a channel within a virtual server.
    ChannelId(i32)
);

/// The servers a subscription applies to.
///
/// `All` is only meaningful at subscription time; events are always
/// announced for one concrete server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerScope {
    /// Every server, including ones booted later.
    All,
    /// One specific server.
    Server(ServerId),
}

impl ServerScope {
    /// Convenience slice subscribing to every server.
    pub const ALL: &'static [ServerScope] = &[ServerScope::All];

    /// Builds a scope list from a list of server ids. An empty list means all servers.
    pub fn from_ids(ids: &[ServerId]) -> Vec<ServerScope> {
        if ids.is_empty() {
            Self::ALL.to_vec()
        } else {
            ids.iter().copied().map(ServerScope::Server).collect()
        }
    }
}

impl From<ServerId> for ServerScope {
    fn from(id: ServerId) -> Self {
        Self::Server(id)
    }
}

impl fmt::Display for ServerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "*"),
            Self::Server(id) => write!(f, "{id}"),
        }
    }
}

/// Identifier of a context menu action as registered with the voice server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub String);

impl ActionId {
    /// Create an action id from any string.
    pub fn new(action: impl Into<String>) -> Self {
        Self(action.into())
    }

    /// Mint a unique action id prefixed with `prefix`.
    pub fn unique(prefix: &str) -> Self {
        Self(format!("{prefix}_{}", Uuid::new_v4().simple()))
    }

    /// Borrow the action string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Names one handler object inside a module.
///
/// Most modules handle their own callbacks and use [`HandlerKey::module`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerKey(pub String);

impl HandlerKey {
    /// Key of the module itself.
    pub fn module() -> Self {
        Self("module".to_string())
    }

    /// Create a handler key with an explicit name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HandlerKey {
    fn default() -> Self {
        Self::module()
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mailbox_id_new() {
        let id1 = MailboxId::new();
        let id2 = MailboxId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_mailbox_id_from_str() {
        let uuid = Uuid::new_v4();
        let id: MailboxId = uuid.to_string().parse().expect("should parse");
        assert_eq!(id.0, uuid);
    }

    #[test]
    fn test_scope_from_ids() {
        assert_eq!(ServerScope::from_ids(&[]), vec![ServerScope::All]);
        assert_eq!(
            ServerScope::from_ids(&[ServerId(1), ServerId(3)]),
            vec![
                ServerScope::Server(ServerId(1)),
                ServerScope::Server(ServerId(3))
            ]
        );
    }

    #[test]
    fn test_wildcard_never_equals_server() {
        assert_ne!(ServerScope::All, ServerScope::Server(ServerId(-1)));
    }

    #[test]
    fn test_unique_action() {
        let a = ActionId::unique("poke");
        let b = ActionId::unique("poke");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("poke_"));
    }

    #[test]
    fn test_int_id_serde_transparent() {
        let json = serde_json::to_string(&ServerId(7)).expect("serialize");
        assert_eq!(json, "7");
        let parsed: SessionId = serde_json::from_str("12").expect("deserialize");
        assert_eq!(parsed, SessionId(12));
    }
}
