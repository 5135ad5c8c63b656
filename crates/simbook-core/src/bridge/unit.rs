//! Execution unit bookkeeping.
//!
//! Every unit admitted to the bridge gets a [`Ticket`]. Tickets are handed out
//! under the admission lock in the same order units enter the host's inbox,
//! so the host can check that it starts them strictly in sequence.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, ThreadId};

/// Sequence number of a unit admitted to the bridge. The first ticket is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    /// Raw sequence number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a unit submitted over the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Admitted; the caller is suspended waiting for the host.
    Submitted,
    /// The host scheduler is executing it exclusively.
    Running,
    /// Result handed back to the caller.
    Completed,
}

/// Shared between every `Bridge` clone and the host scheduler.
#[derive(Debug)]
pub(crate) struct UnitTracker {
    /// Next ticket to hand out. Held while a unit is pushed to the inbox.
    admission: Mutex<u64>,
    /// Ticket currently running, 0 when idle.
    running: AtomicU64,
    /// Highest ticket that reached `Completed`.
    completed_through: AtomicU64,
    /// Thread the host scheduler runs on, once started.
    host_thread: OnceLock<ThreadId>,
}

impl UnitTracker {
    pub(crate) fn new() -> Self {
        Self {
            admission: Mutex::new(1),
            running: AtomicU64::new(0),
            completed_through: AtomicU64::new(0),
            host_thread: OnceLock::new(),
        }
    }

    /// Lock admission. The guarded value is the next ticket number.
    ///
    /// Poisoning is ignored: the counter is only ever incremented after a
    /// successful send, so it is consistent even if a holder panicked.
    pub(crate) fn admission(&self) -> MutexGuard<'_, u64> {
        self.admission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn ticket(raw: u64) -> Ticket {
        Ticket(raw)
    }

    pub(crate) fn bind_host_thread(&self) {
        let current = thread::current().id();
        let bound = *self.host_thread.get_or_init(|| current);
        if bound != current {
            tracing::warn!("host scheduler moved to a different thread");
        }
    }

    /// Whether the host scheduler has started running.
    pub(crate) fn is_host_ready(&self) -> bool {
        self.host_thread.get().is_some()
    }

    pub(crate) fn is_host_thread(&self) -> bool {
        self.host_thread
            .get()
            .is_some_and(|id| *id == thread::current().id())
    }

    /// Mark `ticket` as running.
    ///
    /// Returns `false` if another unit is still running or an earlier ticket
    /// has not completed yet.
    pub(crate) fn begin(&self, ticket: Ticket) -> bool {
        let in_sequence = self.completed_through.load(Ordering::Acquire) + 1 == ticket.0;
        let idle = self
            .running
            .compare_exchange(0, ticket.0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        in_sequence && idle
    }

    /// Mark `ticket` as completed and the bridge idle again.
    pub(crate) fn finish(&self, ticket: Ticket) {
        self.completed_through.fetch_max(ticket.0, Ordering::AcqRel);
        let _ = self
            .running
            .compare_exchange(ticket.0, 0, Ordering::AcqRel, Ordering::Acquire);
    }

    pub(crate) fn state(&self, ticket: Ticket) -> UnitState {
        if ticket.0 <= self.completed_through.load(Ordering::Acquire) {
            UnitState::Completed
        } else if self.running.load(Ordering::Acquire) == ticket.0 {
            UnitState::Running
        } else {
            UnitState::Submitted
        }
    }

    /// Number of units that reached `Completed`.
    pub(crate) fn completed(&self) -> u64 {
        self.completed_through.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let tracker = UnitTracker::new();
        let first = Ticket(1);
        let second = Ticket(2);

        assert_eq!(tracker.state(first), UnitState::Submitted);
        assert!(tracker.begin(first));
        assert_eq!(tracker.state(first), UnitState::Running);
        assert_eq!(tracker.state(second), UnitState::Submitted);

        tracker.finish(first);
        assert_eq!(tracker.state(first), UnitState::Completed);
        assert_eq!(tracker.completed(), 1);
    }

    #[test]
    fn test_begin_rejects_overlap_and_skips() {
        let tracker = UnitTracker::new();
        assert!(!tracker.begin(Ticket(2)), "ticket 1 has not completed");

        let tracker = UnitTracker::new();
        assert!(tracker.begin(Ticket(1)));
        assert!(!tracker.begin(Ticket(2)), "ticket 1 is still running");
    }

    #[test]
    fn test_host_thread_binding() {
        let tracker = UnitTracker::new();
        assert!(!tracker.is_host_ready());
        assert!(!tracker.is_host_thread());
        tracker.bind_host_thread();
        assert!(tracker.is_host_ready());
        assert!(tracker.is_host_thread());

        let other = std::thread::scope(|s| s.spawn(|| tracker.is_host_thread()).join().unwrap());
        assert!(!other);
    }
}
