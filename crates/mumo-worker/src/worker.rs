//! Worker: owns an actor and drives it on a dedicated thread.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing;

use mumo_core::error::AppError;
use mumo_core::result::AppResult;

use crate::actor::{Actor, panic_message};
use crate::mailbox::{Envelope, Mailbox};

enum State<A> {
    /// Not running; the worker holds the actor state.
    Idle(A),
    /// The thread owns the actor state and hands it back through `exit`.
    Running {
        thread: JoinHandle<()>,
        exit: Receiver<A>,
        stopping: bool,
    },
    /// The thread died without returning the actor state.
    Lost,
}

/// Owns one actor and its thread.
///
/// Lifecycle: `Idle -> start -> Running -> stop + join -> Idle`. A worker
/// can be started again after it was stopped; its mailbox is kept.
pub struct Worker<A: Actor> {
    mailbox: Mailbox<A>,
    state: State<A>,
}

impl<A: Actor> Worker<A> {
    /// Create an idle worker with a fresh mailbox.
    pub fn new(name: impl Into<String>, actor: A) -> Self {
        Self::with_mailbox(Mailbox::new(name), actor)
    }

    /// Create an idle worker on an existing mailbox.
    ///
    /// Useful when handles to the mailbox had to exist before the actor
    /// state could be built.
    pub fn with_mailbox(mailbox: Mailbox<A>, actor: A) -> Self {
        Self {
            mailbox,
            state: State::Idle(actor),
        }
    }

    /// The actor's mailbox.
    pub fn mailbox(&self) -> &Mailbox<A> {
        &self.mailbox
    }

    /// The actor's name (also the thread name).
    pub fn name(&self) -> &str {
        self.mailbox.name()
    }

    /// Spawn the worker thread. Starting a running worker is a logged no-op.
    pub fn start(&mut self) -> AppResult<()> {
        self.reap();

        let actor = match std::mem::replace(&mut self.state, State::Lost) {
            State::Idle(actor) => actor,
            running @ State::Running { .. } => {
                self.state = running;
                tracing::warn!(actor = %self.name(), "Worker already running");
                return Ok(());
            }
            State::Lost => {
                return Err(AppError::internal(format!(
                    "Worker '{}' lost its state and cannot be restarted",
                    self.name()
                )));
            }
        };

        let (exit_tx, exit_rx) = crossbeam_channel::bounded(1);
        let mailbox = self.mailbox.clone();
        let spawned = thread::Builder::new()
            .name(self.name().to_string())
            .spawn(move || run_loop(actor, mailbox, exit_tx));

        match spawned {
            Ok(thread) => {
                self.state = State::Running {
                    thread,
                    exit: exit_rx,
                    stopping: false,
                };
                tracing::debug!(actor = %self.name(), "Worker started");
                Ok(())
            }
            Err(e) => Err(AppError::with_source(
                mumo_core::ErrorKind::Internal,
                format!("Failed to spawn thread for '{}'", self.name()),
                e,
            )),
        }
    }

    /// Ask the worker to stop after the messages queued ahead of the stop marker.
    ///
    /// With `force`, queued messages are discarded first. Does not block;
    /// use [`Worker::join`] to wait for the thread. Stopping a worker that is
    /// not running, or is already stopping, is a no-op.
    pub fn stop(&mut self, force: bool) {
        self.reap();

        match &mut self.state {
            State::Running { stopping, .. } if !*stopping => {
                if force {
                    let dropped = self.mailbox.drain();
                    if dropped > 0 {
                        tracing::debug!(
                            actor = %self.mailbox.name(),
                            "Discarded {} queued messages",
                            dropped
                        );
                    }
                }
                self.mailbox.send_stop();
                *stopping = true;
            }
            State::Running { .. } => {
                tracing::debug!(actor = %self.mailbox.name(), "Worker already stopping");
            }
            _ => {
                tracing::debug!(actor = %self.mailbox.name(), "Worker not running");
            }
        }
    }

    /// Wait up to `timeout` for the thread to exit.
    ///
    /// Returns `false` if the thread is still alive after the deadline. The
    /// thread is not killed; it is left to finish on its own and reaped later.
    pub fn join(&mut self, timeout: Duration) -> bool {
        let outcome = match &self.state {
            State::Running { exit, .. } => exit.recv_timeout(timeout),
            _ => return true,
        };

        match outcome {
            Ok(actor) => {
                self.finish(Some(actor));
                true
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.finish(None);
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    actor = %self.name(),
                    "Worker did not stop within {:?}, abandoning thread",
                    timeout
                );
                false
            }
        }
    }

    /// Whether the worker thread is alive.
    pub fn is_running(&mut self) -> bool {
        self.reap();
        matches!(self.state, State::Running { .. })
    }

    /// Borrow the actor state while the worker is idle.
    pub fn actor(&self) -> Option<&A> {
        match &self.state {
            State::Idle(actor) => Some(actor),
            _ => None,
        }
    }

    /// Mutably borrow the actor state while the worker is idle.
    pub fn actor_mut(&mut self) -> Option<&mut A> {
        match &mut self.state {
            State::Idle(actor) => Some(actor),
            _ => None,
        }
    }

    /// Collect the actor state if the thread has exited on its own.
    fn reap(&mut self) {
        let outcome = match &self.state {
            State::Running { exit, .. } => exit.try_recv(),
            _ => return,
        };

        match outcome {
            Ok(actor) => self.finish(Some(actor)),
            Err(TryRecvError::Disconnected) => self.finish(None),
            Err(TryRecvError::Empty) => {}
        }
    }

    fn finish(&mut self, actor: Option<A>) {
        let next = match actor {
            Some(actor) => State::Idle(actor),
            None => {
                tracing::error!(actor = %self.name(), "Worker thread exited without its state");
                State::Lost
            }
        };

        if let State::Running { thread, .. } = std::mem::replace(&mut self.state, next) {
            if thread.join().is_err() {
                tracing::error!(actor = %self.name(), "Worker thread panicked");
            }
        }
    }
}

impl<A: Actor> Drop for Worker<A> {
    fn drop(&mut self) {
        // Without a stop marker the thread would block on the queue forever.
        self.stop(false);
    }
}

impl<A: Actor> fmt::Debug for Worker<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Idle(_) => "idle",
            State::Running { stopping: false, .. } => "running",
            State::Running { stopping: true, .. } => "stopping",
            State::Lost => "lost",
        };
        f.debug_struct("Worker")
            .field("name", &self.name())
            .field("state", &state)
            .finish()
    }
}

/// Body of every worker thread.
fn run_loop<A: Actor>(mut actor: A, mailbox: Mailbox<A>, exit: Sender<A>) {
    let name = mailbox.name().to_string();
    tracing::debug!(actor = %name, "Enter message loop");

    guarded(&name, "on_start", || actor.on_start());

    loop {
        let job = match mailbox.recv() {
            Envelope::Job(job) => job,
            Envelope::Stop => break,
        };

        match panic::catch_unwind(AssertUnwindSafe(|| job(&mut actor))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(actor = %name, "Message failed: {}", e),
            Err(payload) => tracing::error!(
                actor = %name,
                "Message panicked: {}",
                panic_message(payload.as_ref())
            ),
        }
    }

    guarded(&name, "on_stop", || actor.on_stop());
    tracing::debug!(actor = %name, "Leave message loop");

    let _ = exit.send(actor);
}

fn guarded(name: &str, hook: &str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        tracing::error!(
            actor = %name,
            "{} panicked: {}",
            hook,
            panic_message(payload.as_ref())
        );
    }
}
