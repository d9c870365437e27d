//! Actor runtime for mumo.
//!
//! This crate provides:
//! - The [`Actor`] trait with start/stop hooks
//! - [`Mailbox`], the cloneable submission handle of one actor queue, with
//!   fire-and-forget (`cast`) and blocking (`call`) message submission
//! - [`Worker`], which owns an actor and runs it on a dedicated named thread
//!
//! All state of an actor is touched only by its own thread. Other threads
//! interact with it exclusively by submitting closures to its mailbox.

pub mod actor;
pub mod mailbox;
pub mod worker;

pub use actor::{Actor, panic_message};
pub use mailbox::{Job, Mailbox};
pub use worker::Worker;
