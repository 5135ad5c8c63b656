//! Host cooperative scheduler.
//!
//! Owns the design and executes, on the thread that calls [`HostScheduler::run`],
//! native tasks and bridge-submitted units one at a time. Nothing preempts a
//! task once it starts.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::bridge::{Bridge, Job, Ticket, UnitTracker};
use crate::error::Result;

use super::panic_message;

/// Native host task.
pub type HostTask<D> = Box<dyn for<'a> FnOnce(&mut HostContext<'a, D>) + Send>;

/// View of the host handed to a running task or unit.
pub struct HostContext<'a, D> {
    design: &'a mut D,
    ready: &'a mut VecDeque<HostTask<D>>,
    ticket: Option<Ticket>,
}

impl<'a, D> HostContext<'a, D> {
    /// The design owned by the host.
    pub fn design(&self) -> &D {
        self.design
    }

    /// Mutable access to the design.
    pub fn design_mut(&mut self) -> &mut D {
        self.design
    }

    /// Queue a native task to run after the current one finishes.
    pub fn spawn(&mut self, task: impl for<'b> FnOnce(&mut HostContext<'b, D>) + Send + 'static) {
        self.ready.push_back(Box::new(task));
    }

    /// Ticket of the bridge unit being run, `None` for native tasks.
    pub fn ticket(&self) -> Option<Ticket> {
        self.ticket
    }
}

/// Single-threaded run-to-completion scheduler owning the design.
pub struct HostScheduler<D> {
    design: D,
    ready: VecDeque<HostTask<D>>,
    inbox: mpsc::UnboundedReceiver<Job<D>>,
    tracker: Arc<UnitTracker>,
    tasks_run: u64,
    units_run: u64,
}

impl<D: Send + 'static> HostScheduler<D> {
    /// Create a scheduler for `design` and the bridge that feeds it.
    pub fn new(design: D) -> (Self, Bridge<D>) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let tracker = Arc::new(UnitTracker::new());
        let bridge = Bridge::new(tx, tracker.clone());

        let scheduler = Self {
            design,
            ready: VecDeque::new(),
            inbox,
            tracker,
            tasks_run: 0,
            units_run: 0,
        };
        (scheduler, bridge)
    }

    /// Queue a native task.
    pub fn spawn(&mut self, task: impl for<'a> FnOnce(&mut HostContext<'a, D>) + Send + 'static) {
        self.ready.push_back(Box::new(task));
    }

    /// The design owned by the scheduler.
    pub fn design(&self) -> &D {
        &self.design
    }

    /// Run until every `Bridge` is dropped and no native task is left.
    ///
    /// Blocks the calling thread, which becomes the host thread. Returns the
    /// design so the caller can inspect its final state.
    pub fn run(mut self) -> Result<D> {
        self.tracker.bind_host_thread();
        tracing::debug!("host scheduler running");

        loop {
            self.drain_ready();
            let Some(job) = futures::executor::block_on(self.inbox.recv()) else {
                break;
            };
            self.run_unit(job);
        }
        self.drain_ready();

        tracing::debug!(
            units = self.units_run,
            tasks = self.tasks_run,
            "host scheduler stopped"
        );
        Ok(self.design)
    }

    fn drain_ready(&mut self) {
        while let Some(task) = self.ready.pop_front() {
            let mut ctx = HostContext {
                design: &mut self.design,
                ready: &mut self.ready,
                ticket: None,
            };
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task(&mut ctx))) {
                tracing::error!("host task panicked: {}", panic_message(payload.as_ref()));
            }
            self.tasks_run += 1;
        }
    }

    fn run_unit(&mut self, job: Job<D>) {
        let Job { ticket, run } = job;

        if !self.tracker.begin(ticket) {
            tracing::error!(%ticket, "unit started while another was in flight or out of order");
        }
        tracing::trace!(%ticket, "unit running");

        let mut ctx = HostContext {
            design: &mut self.design,
            ready: &mut self.ready,
            ticket: Some(ticket),
        };
        let deliver = run(&mut ctx);

        self.tracker.finish(ticket);
        self.units_run += 1;
        deliver();
        tracing::trace!(%ticket, "unit completed");
    }
}
