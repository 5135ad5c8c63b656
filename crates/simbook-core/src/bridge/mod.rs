//! Cross-scheduler execution bridge.
//!
//! The kernel loop runs on a worker thread; the simulated design belongs to
//! the host scheduler's thread. A [`Bridge`] moves one execution unit at a
//! time from the former to the latter and hands the result back.
//!
//! ```text
//! kernel loop (worker thread)            host scheduler (simulator thread)
//!     │                                      │
//!     ├── submit(unit) ── ticket #n ──────▶  inbox (FIFO)
//!     │      state: Submitted                │
//!     │                                      ├── begin #n      state: Running
//!     │                                      ├── unit(&mut HostContext)
//!     │                                      ├── finish #n     state: Completed
//!     ◀──────────── oneshot(Result<T>) ──────┘
//! ```
//!
//! Units are admitted in call order, run one at a time to completion, and
//! every unit yields exactly one `Result`. There is no cancellation: a
//! dropped [`Pending`] does not stop its unit.

mod unit;

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::sched::{HostContext, panic_message};

pub use unit::{Ticket, UnitState};
pub(crate) use unit::UnitTracker;

/// Hands the result of a finished unit back to its caller.
pub(crate) type Deliver = Box<dyn FnOnce() + Send>;

/// A unit as seen by the host: run it, then deliver.
pub(crate) type JobFn<D> = Box<dyn for<'a> FnOnce(&mut HostContext<'a, D>) -> Deliver + Send>;

/// An admitted unit waiting in the host inbox.
pub(crate) struct Job<D> {
    pub(crate) ticket: Ticket,
    pub(crate) run: JobFn<D>,
}

/// Handle used by the kernel loop to run work on the host scheduler.
///
/// Cheap to clone. The host scheduler keeps running until every clone has
/// been dropped.
pub struct Bridge<D> {
    inbox: mpsc::UnboundedSender<Job<D>>,
    tracker: Arc<UnitTracker>,
}

impl<D> Clone for Bridge<D> {
    fn clone(&self) -> Self {
        Self {
            inbox: self.inbox.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

impl<D: 'static> Bridge<D> {
    pub(crate) fn new(inbox: mpsc::UnboundedSender<Job<D>>, tracker: Arc<UnitTracker>) -> Self {
        Self { inbox, tracker }
    }

    /// Admit a unit and return a future for its result.
    ///
    /// Admission happens before this returns, so units submitted one after
    /// another run in that order even if their futures are polled out of
    /// order. A failing unit resolves to its error; a panicking unit resolves
    /// to [`Error::Panicked`].
    pub fn submit<T, F>(&self, unit: F) -> Pending<T>
    where
        T: Send + 'static,
        F: for<'a> FnOnce(&mut HostContext<'a, D>) -> Result<T> + Send + 'static,
    {
        let (reply, receiver) = oneshot::channel();

        let run: JobFn<D> = Box::new(move |ctx: &mut HostContext<'_, D>| {
            let result = match panic::catch_unwind(AssertUnwindSafe(|| unit(ctx))) {
                Ok(result) => result,
                Err(payload) => Err(Error::Panicked(panic_message(payload.as_ref()))),
            };
            Box::new(move || {
                if reply.send(result).is_err() {
                    tracing::debug!("caller went away, discarding unit result");
                }
            })
        });

        let mut next = self.tracker.admission();
        let ticket = UnitTracker::ticket(*next);
        if self.inbox.send(Job { ticket, run }).is_err() {
            return Pending::failed(self.tracker.clone(), Error::HostUnavailable);
        }
        *next += 1;
        drop(next);

        tracing::trace!(%ticket, "unit submitted");
        Pending {
            ticket: Some(ticket),
            tracker: self.tracker.clone(),
            inner: PendingInner::Waiting(receiver),
        }
    }

    /// Run a unit on the host and block the calling thread until it is done.
    ///
    /// Suspends the caller's current cooperative step, including when called
    /// from inside an async runtime. Must not be called from the host
    /// scheduler's own thread, nor before [`HostScheduler::run`] has started;
    /// use [`submit`](Self::submit) to queue work ahead of the host.
    ///
    /// [`HostScheduler::run`]: crate::sched::HostScheduler::run
    pub fn run_on_host<T, F>(&self, unit: F) -> Result<T>
    where
        T: Send + 'static,
        F: for<'a> FnOnce(&mut HostContext<'a, D>) -> Result<T> + Send + 'static,
    {
        if self.inbox.is_closed() {
            return Err(Error::HostUnavailable);
        }
        if !self.tracker.is_host_ready() {
            return Err(Error::HostNotReady);
        }
        if self.tracker.is_host_thread() {
            return Err(Error::WrongThread);
        }
        futures::executor::block_on(self.submit(unit))
    }

    /// Request interruption of the running unit.
    ///
    /// Always fails with [`Error::InterruptUnsupported`]: units run to
    /// completion on the host.
    pub fn interrupt(&self) -> Result<()> {
        tracing::warn!("interrupt requested but units cannot be interrupted");
        Err(Error::InterruptUnsupported)
    }

    /// Current state of an admitted unit.
    pub fn state(&self, ticket: Ticket) -> UnitState {
        self.tracker.state(ticket)
    }

    /// Number of units that have completed so far.
    pub fn completed(&self) -> u64 {
        self.tracker.completed()
    }

    /// Whether the host scheduler can still accept units.
    pub fn is_host_alive(&self) -> bool {
        !self.inbox.is_closed()
    }

    /// Whether the host scheduler has started running.
    pub fn is_host_ready(&self) -> bool {
        self.tracker.is_host_ready()
    }
}

enum PendingInner<T> {
    Waiting(oneshot::Receiver<Result<T>>),
    Failed(Option<Error>),
}

/// Result of a submitted unit, resolved once the host has run it.
#[must_use = "the unit runs regardless, but its result is lost if this is dropped"]
pub struct Pending<T> {
    ticket: Option<Ticket>,
    tracker: Arc<UnitTracker>,
    inner: PendingInner<T>,
}

impl<T> Pending<T> {
    fn failed(tracker: Arc<UnitTracker>, error: Error) -> Self {
        Self {
            ticket: None,
            tracker,
            inner: PendingInner::Failed(Some(error)),
        }
    }

    /// Ticket of the unit, or `None` if it was never admitted.
    pub fn ticket(&self) -> Option<Ticket> {
        self.ticket
    }

    /// Current state of the unit, or `None` if it was never admitted.
    pub fn state(&self) -> Option<UnitState> {
        self.ticket.map(|ticket| self.tracker.state(ticket))
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.inner {
            PendingInner::Waiting(receiver) => match Pin::new(receiver).poll(cx) {
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                // Host dropped the unit without running it.
                Poll::Ready(Err(_)) => Poll::Ready(Err(Error::HostUnavailable)),
                Poll::Pending => Poll::Pending,
            },
            PendingInner::Failed(error) => {
                Poll::Ready(Err(error.take().unwrap_or(Error::HostUnavailable)))
            }
        }
    }
}
