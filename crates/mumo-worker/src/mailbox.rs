//! Mailbox: the thread-safe submission surface of one actor.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing;

use mumo_core::error::AppError;
use mumo_core::result::AppResult;
use mumo_core::types::MailboxId;

use crate::actor::panic_message;

/// A unit of work executed on the actor thread against the actor state.
pub type Job<A> = Box<dyn FnOnce(&mut A) -> AppResult<()> + Send + 'static>;

/// What travels through an actor queue.
pub(crate) enum Envelope<A> {
    /// Run a job.
    Job(Job<A>),
    /// Leave the message loop.
    Stop,
}

struct Inner<A> {
    id: MailboxId,
    name: String,
    tx: Sender<Envelope<A>>,
    rx: Receiver<Envelope<A>>,
}

/// Cloneable handle to an actor's unbounded FIFO queue.
///
/// Jobs submitted from one thread run in submission order. The queue is
/// owned by the mailbox, not by the worker thread, so it survives restarts.
pub struct Mailbox<A> {
    inner: Arc<Inner<A>>,
}

impl<A: 'static> Mailbox<A> {
    /// Create a mailbox with a fresh queue.
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            inner: Arc::new(Inner {
                id: MailboxId::new(),
                name: name.into(),
                tx,
                rx,
            }),
        }
    }

    /// Identity of this queue.
    pub fn id(&self) -> MailboxId {
        self.inner.id
    }

    /// Name of the owning actor.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of envelopes currently queued.
    pub fn len(&self) -> usize {
        self.inner.rx.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.rx.is_empty()
    }

    /// Fire-and-forget: enqueue `f` and return immediately.
    ///
    /// An error returned by `f` is logged by the actor's run loop and
    /// never reaches the caller.
    pub fn cast<F>(&self, f: F)
    where
        F: FnOnce(&mut A) -> AppResult<()> + Send + 'static,
    {
        self.submit(Envelope::Job(Box::new(f)));
    }

    /// Blocking call without a deadline.
    pub fn call<R, F>(&self, f: F) -> AppResult<R>
    where
        F: FnOnce(&mut A) -> AppResult<R> + Send + 'static,
        R: Send + 'static,
    {
        self.call_timeout(f, None)
    }

    /// Blocking call: enqueue `f`, then wait for its result.
    ///
    /// On timeout the job stays queued and still runs later; only the wait
    /// is abandoned. If the job is discarded before it runs (forced drain),
    /// the call fails with `MailboxClosed`. A panic inside `f` is reported
    /// as `Panicked`.
    ///
    /// Calling this from the actor's own thread blocks until the deadline
    /// (or forever without one), since the actor cannot process the job
    /// while it waits.
    pub fn call_timeout<R, F>(&self, f: F, timeout: Option<Duration>) -> AppResult<R>
    where
        F: FnOnce(&mut A) -> AppResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded::<AppResult<R>>(1);

        self.submit(Envelope::Job(Box::new(move |actor: &mut A| {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| f(actor))) {
                Ok(outcome) => outcome,
                Err(payload) => Err(AppError::panicked(panic_message(payload.as_ref()))),
            };
            let failure = outcome.as_ref().err().cloned();
            // The caller may have timed out already.
            let _ = reply_tx.send(outcome);
            match failure {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })));

        let reply = match timeout {
            Some(deadline) => reply_rx.recv_timeout(deadline).map_err(|e| match e {
                RecvTimeoutError::Timeout => AppError::timeout(format!(
                    "No reply from '{}' within {:?}",
                    self.name(),
                    deadline
                )),
                RecvTimeoutError::Disconnected => self.closed(),
            }),
            None => reply_rx.recv().map_err(|_| self.closed()),
        };

        reply?
    }

    /// Enqueue the stop marker.
    pub(crate) fn send_stop(&self) {
        self.submit(Envelope::Stop);
    }

    /// Discard everything currently queued. Returns the number of envelopes dropped.
    ///
    /// Jobs submitted concurrently may or may not be caught by the drain.
    pub(crate) fn drain(&self) -> usize {
        self.inner.rx.try_iter().count()
    }

    /// Block until the next envelope arrives.
    pub(crate) fn recv(&self) -> Envelope<A> {
        // The sender half lives in `inner`, so the channel cannot disconnect
        // while this mailbox exists.
        self.inner.rx.recv().unwrap_or(Envelope::Stop)
    }

    fn submit(&self, envelope: Envelope<A>) {
        if self.inner.tx.send(envelope).is_err() {
            tracing::warn!(actor = %self.inner.name, "Dropped message for closed mailbox");
        }
    }

    fn closed(&self) -> AppError {
        AppError::mailbox_closed(format!(
            "Message to '{}' was discarded before it ran",
            self.name()
        ))
    }
}

impl<A> Clone for Mailbox<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> PartialEq for Mailbox<A> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<A> Eq for Mailbox<A> {}

impl<A> Hash for Mailbox<A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl<A> fmt::Debug for Mailbox<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("queued", &self.inner.rx.len())
            .finish()
    }
}
