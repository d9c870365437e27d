//! Transport error type.

use mumo_core::error::{AppError, ErrorKind};
use mumo_core::types::{ChannelId, ServerId, SessionId};

/// Errors reported by a transport implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The voice server refused the connection.
    #[error("Connection refused by {0}")]
    ConnectionRefused(String),

    /// The shared secret was rejected.
    #[error("Invalid shared secret")]
    InvalidSecret,

    /// No virtual server with this id exists.
    #[error("Server {0} not found")]
    ServerNotFound(ServerId),

    /// The virtual server is not running.
    #[error("Server {0} is not running")]
    ServerStopped(ServerId),

    /// No connected user has this session.
    #[error("Session {0} not found")]
    InvalidSession(SessionId),

    /// No channel with this id exists.
    #[error("Channel {0} not found")]
    InvalidChannel(ChannelId),

    /// The callback handle is unknown to the server.
    #[error("Invalid callback")]
    InvalidCallback,

    /// Anything else the RPC layer reports.
    #[error("{0}")]
    Other(String),
}

/// Result alias for transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

impl TransportError {
    /// Whether the error means the connection itself is gone.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Self::ConnectionRefused(_) | Self::InvalidSecret)
    }
}

impl From<TransportError> for AppError {
    fn from(err: TransportError) -> Self {
        let kind = match &err {
            TransportError::ServerNotFound(_)
            | TransportError::InvalidSession(_)
            | TransportError::InvalidChannel(_) => ErrorKind::NotFound,
            _ => ErrorKind::Transport,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}
