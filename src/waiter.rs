//! Waiter records for suspended channel parties, and the settlement cells
//! blocking calls park on.

use std::mem;
use std::sync::Mutex;

use crate::error::{RecvError, SendError};
use crate::signal::Signal;

/// Abort predicate attached to a waiter registration.
///
/// Consulted under the channel lock whenever the waiter reaches the head of
/// its queue. Answering `true` means the waiter lost interest and is pruned
/// without being settled. For a waiter registered by `select`, the first
/// consultation that answers `false` also commits the select to that
/// operation, so the examining party must then settle the waiter.
pub type AbortFn = Box<dyn FnMut() -> bool + Send>;

/// Completion callback of a deferred receive. `None` reports a closed channel.
pub type RecvCallback<T> = Box<dyn FnOnce(Option<T>) + Send>;

/// Completion callback of a deferred send. `false` reports a closed channel.
pub type SendCallback = Box<dyn FnOnce(bool) + Send>;

/// A suspended receiver. Settled at most once, under the channel lock.
pub(crate) struct RecvWaiter<T> {
    abort: AbortFn,
    settle: Box<dyn FnOnce(Option<T>) + Send>,
}

impl<T> RecvWaiter<T> {
    pub(crate) fn new(abort: AbortFn, settle: Box<dyn FnOnce(Option<T>) + Send>) -> Self {
        Self { abort, settle }
    }

    pub(crate) fn is_aborted(&mut self) -> bool {
        (self.abort)()
    }

    pub(crate) fn settle(self, value: Option<T>) {
        (self.settle)(value);
    }
}

/// A suspended sender. Settling with `true` surrenders the armed value for
/// delivery; settling with `false` reports closure and leaves the value with
/// its owner.
pub(crate) struct SendWaiter<T> {
    abort: AbortFn,
    settle: Box<dyn FnOnce(bool) -> Option<T> + Send>,
}

impl<T> SendWaiter<T> {
    pub(crate) fn new(abort: AbortFn, settle: Box<dyn FnOnce(bool) -> Option<T> + Send>) -> Self {
        Self { abort, settle }
    }

    pub(crate) fn is_aborted(&mut self) -> bool {
        (self.abort)()
    }

    pub(crate) fn settle(self, ok: bool) -> Option<T> {
        (self.settle)(ok)
    }
}

enum RecvOutcome<T> {
    Waiting,
    Value(T),
    Closed,
    Canceled,
}

/// Settlement cell a blocking receive parks on.
pub(crate) struct RecvPark<T> {
    outcome: Mutex<RecvOutcome<T>>,
    signal: Signal,
}

impl<T> RecvPark<T> {
    pub(crate) fn new() -> Self {
        Self {
            outcome: Mutex::new(RecvOutcome::Waiting),
            signal: Signal::new(),
        }
    }

    pub(crate) fn settle(&self, value: Option<T>) {
        {
            let mut outcome = self.outcome.lock().unwrap();
            *outcome = match value {
                Some(v) => RecvOutcome::Value(v),
                None => RecvOutcome::Closed,
            };
        }
        self.signal.notify();
    }

    pub(crate) fn cancel(&self) {
        {
            let mut outcome = self.outcome.lock().unwrap();
            *outcome = RecvOutcome::Canceled;
        }
        self.signal.notify();
    }

    pub(crate) fn wait(&self) -> Result<T, RecvError> {
        self.signal.wait();
        let mut outcome = self.outcome.lock().unwrap();
        match mem::replace(&mut *outcome, RecvOutcome::Waiting) {
            RecvOutcome::Value(v) => Ok(v),
            RecvOutcome::Closed => Err(RecvError::Closed),
            RecvOutcome::Canceled => Err(RecvError::Canceled),
            RecvOutcome::Waiting => unreachable!("receive woken without a settlement"),
        }
    }
}

enum SendOutcome<T> {
    Armed(T),
    Delivered,
    Closed(T),
    Canceled(T),
}

/// Settlement cell a blocking send parks on. Holds the armed value until it
/// is either delivered or handed back to the caller.
pub(crate) struct SendPark<T> {
    outcome: Mutex<SendOutcome<T>>,
    signal: Signal,
}

impl<T> SendPark<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            outcome: Mutex::new(SendOutcome::Armed(value)),
            signal: Signal::new(),
        }
    }

    pub(crate) fn settle(&self, ok: bool) -> Option<T> {
        let delivered = {
            let mut outcome = self.outcome.lock().unwrap();
            let value = match mem::replace(&mut *outcome, SendOutcome::Delivered) {
                SendOutcome::Armed(v) => v,
                other => {
                    *outcome = other;
                    return None;
                }
            };
            if ok {
                Some(value)
            } else {
                *outcome = SendOutcome::Closed(value);
                None
            }
        };
        self.signal.notify();
        delivered
    }

    pub(crate) fn cancel(&self) {
        {
            let mut outcome = self.outcome.lock().unwrap();
            let state = mem::replace(&mut *outcome, SendOutcome::Delivered);
            *outcome = match state {
                SendOutcome::Armed(v) => SendOutcome::Canceled(v),
                other => other,
            };
        }
        self.signal.notify();
    }

    pub(crate) fn wait(&self) -> Result<(), SendError<T>> {
        self.signal.wait();
        let mut outcome = self.outcome.lock().unwrap();
        match mem::replace(&mut *outcome, SendOutcome::Delivered) {
            SendOutcome::Delivered => Ok(()),
            SendOutcome::Closed(v) => Err(SendError::Closed(v)),
            SendOutcome::Canceled(v) => Err(SendError::Canceled(v)),
            SendOutcome::Armed(_) => unreachable!("send woken while still armed"),
        }
    }
}
