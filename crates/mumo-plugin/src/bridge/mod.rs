//! Bridge between the transport and the manager.
//!
//! - [`MetaForwarder`], [`ServerForwarder`], [`ContextForwarder`] turn
//!   transport listener calls into manager announcements
//! - [`MenuForwarder`] is the dispatch callback behind context menu entries
//! - [`ConnectionSupervisor`] attaches listeners and runs the watchdog

pub mod forwarders;
pub mod supervisor;

pub use forwarders::{ContextForwarder, MenuForwarder, MetaForwarder, ServerForwarder};
pub use supervisor::ConnectionSupervisor;
