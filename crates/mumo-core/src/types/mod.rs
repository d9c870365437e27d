//! Shared domain types.

pub mod id;

pub use id::{ActionId, CallbackId, ChannelId, HandlerKey, MailboxId, ServerId, ServerScope, SessionId};
