//! Transport boundary between mumo and the voice server.
//!
//! The RPC mechanism itself lives outside this workspace. This crate
//! defines what the moderator needs from it:
//! - [`MetaProxy`] and [`ServerProxy`] handles for issuing commands
//! - [`MetaListener`], [`ServerListener`] and [`ContextListener`] callbacks
//!   the transport invokes when the voice server reports events
//! - The data types exchanged ([`User`], [`Channel`], [`TextMessage`])
//!
//! With the `mock` feature (on by default) an in-memory transport is
//! available in [`mock`], used by tests and by `mumo --mock`.

pub mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod proxy;
pub mod types;

pub use error::{TransportError, TransportResult};
pub use proxy::{
    ContextCallback, ContextListener, MetaListener, MetaProxy, ServerListener, ServerProxy,
};
pub use types::{Channel, ContextMask, ContextTarget, TextMessage, User};
