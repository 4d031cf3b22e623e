use crossbeam_utils::Backoff;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, Thread};

/// A one-shot wakeup for a single parked thread.
pub struct Signal {
    state: AtomicUsize,
    thread: Thread,
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl Signal {
    /// Creates a signal owned by the current thread.
    pub fn new() -> Self {
        Self {
            state: AtomicUsize::new(0),
            thread: thread::current(),
        }
    }

    /// Blocks the owning thread until the signal is notified.
    ///
    /// Spins briefly before parking.
    pub fn wait(&self) {
        let backoff = Backoff::new();
        while self.state.load(Ordering::Acquire) == 0 {
            if backoff.is_completed() {
                thread::park();
            } else {
                backoff.snooze();
            }
        }
    }

    /// Notifies the signal, waking the owning thread.
    pub fn notify(&self) {
        self.state.store(1, Ordering::Release);
        self.thread.unpark();
    }

    /// Returns true if the signal has been notified.
    pub fn is_notified(&self) -> bool {
        self.state.load(Ordering::Relaxed) != 0
    }
}
