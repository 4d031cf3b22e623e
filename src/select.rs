//! Multi-way selection over channel operations.
//!
//! A [`select`] call takes a set of send and receive operations, attempts
//! each one in order without blocking, and, if none is ready, parks all of
//! them behind a shared commit flag so that exactly one settles. The
//! operations may target channels of different flavors and value types.
//!
//! One select call must not both send to and receive from the same channel;
//! the commit protocol runs the abort predicates under the channel lock and
//! such a pairing could observe its own registration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{TryRecvError, TrySendError};
use crate::signal::Signal;
use crate::stop::StopToken;
use crate::waiter::{AbortFn, RecvCallback, SendCallback};

/// Channel halves a receive operation can draw from.
pub trait Source<T> {
    /// Attempts to receive without blocking.
    fn try_recv(&self) -> Result<T, TryRecvError>;

    /// Registers a deferred receive with an abort predicate and a completion
    /// callback.
    fn recv_deferred(&self, abort: AbortFn, on_settle: RecvCallback<T>);
}

/// Channel halves a send operation can push into.
pub trait Sink<T> {
    /// Attempts to send without blocking.
    fn try_send(&self, value: T) -> Result<(), TrySendError<T>>;

    /// Registers a deferred send with an abort predicate and a completion
    /// callback.
    fn send_deferred(&self, value: T, abort: AbortFn, on_settle: SendCallback);
}

/// A channel operation a select call can attempt and, failing that, park.
pub trait Operation {
    /// Attempts the operation without blocking. Returns true if it settled,
    /// including settling against a closed channel.
    fn try_execute(&mut self) -> bool;

    /// Parks the operation on its channel with the given abort predicate.
    fn schedule(&mut self, abort: AbortFn);
}

/// A receive bound to a channel, built by [`recv`] or [`recv_then`].
pub struct RecvOp<'a, T> {
    chan: &'a dyn Source<T>,
    on_settle: Option<RecvCallback<T>>,
}

/// Builds a receive operation that discards its value.
pub fn recv<T>(chan: &dyn Source<T>) -> RecvOp<'_, T> {
    RecvOp {
        chan,
        on_settle: Some(Box::new(|_| {})),
    }
}

/// Builds a receive operation that hands its outcome to `on_settle`;
/// `None` reports a closed channel.
pub fn recv_then<T, F>(chan: &dyn Source<T>, on_settle: F) -> RecvOp<'_, T>
where
    F: FnOnce(Option<T>) + Send + 'static,
{
    RecvOp {
        chan,
        on_settle: Some(Box::new(on_settle)),
    }
}

impl<T> Operation for RecvOp<'_, T> {
    fn try_execute(&mut self) -> bool {
        let on_settle = match self.on_settle.take() {
            Some(on_settle) => on_settle,
            None => return false,
        };
        match self.chan.try_recv() {
            Ok(value) => {
                on_settle(Some(value));
                true
            }
            Err(TryRecvError::Closed) => {
                on_settle(None);
                true
            }
            Err(TryRecvError::Exhausted) => {
                self.on_settle = Some(on_settle);
                false
            }
        }
    }

    fn schedule(&mut self, abort: AbortFn) {
        if let Some(on_settle) = self.on_settle.take() {
            self.chan.recv_deferred(abort, on_settle);
        }
    }
}

/// A send of a specific value bound to a channel, built by [`send`] or
/// [`send_then`].
pub struct SendOp<'a, T> {
    chan: &'a dyn Sink<T>,
    value: Option<T>,
    on_settle: Option<SendCallback>,
}

/// Builds a send operation with no completion callback.
pub fn send<T>(chan: &dyn Sink<T>, value: T) -> SendOp<'_, T> {
    SendOp {
        chan,
        value: Some(value),
        on_settle: Some(Box::new(|_| {})),
    }
}

/// Builds a send operation that reports its outcome to `on_settle`;
/// `false` reports a closed channel.
pub fn send_then<T, F>(chan: &dyn Sink<T>, value: T, on_settle: F) -> SendOp<'_, T>
where
    F: FnOnce(bool) + Send + 'static,
{
    SendOp {
        chan,
        value: Some(value),
        on_settle: Some(Box::new(on_settle)),
    }
}

impl<T> Operation for SendOp<'_, T> {
    fn try_execute(&mut self) -> bool {
        let (value, on_settle) = match (self.value.take(), self.on_settle.take()) {
            (Some(value), Some(on_settle)) => (value, on_settle),
            _ => return false,
        };
        match self.chan.try_send(value) {
            Ok(()) => {
                on_settle(true);
                true
            }
            Err(TrySendError::Closed(_)) => {
                on_settle(false);
                true
            }
            Err(TrySendError::Exhausted(value)) => {
                self.value = Some(value);
                self.on_settle = Some(on_settle);
                false
            }
        }
    }

    fn schedule(&mut self, abort: AbortFn) {
        if let (Some(value), Some(on_settle)) = (self.value.take(), self.on_settle.take()) {
            self.chan.send_deferred(value, abort, on_settle);
        }
    }
}

/// Shared decision point electing exactly one operation among siblings.
///
/// The flag is claimed with a compare-exchange so the selecting thread
/// itself can commit during scheduling (a closed channel settles there)
/// without re-entering a lock it already holds. Per-channel claims stay
/// serialized by that channel's lock.
struct Commit {
    done: AtomicBool,
    signal: Signal,
}

impl Commit {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            done: AtomicBool::new(false),
            signal: Signal::new(),
        })
    }

    /// Tries to elect the caller. The winner wakes the selecting thread.
    fn claim(&self) -> bool {
        if self
            .done
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.signal.notify();
            true
        } else {
            false
        }
    }

    fn abort_fn(commit: &Arc<Self>) -> AbortFn {
        let commit = Arc::clone(commit);
        Box::new(move || !commit.claim())
    }
}

fn run_select<F: FnOnce()>(
    token: Option<&StopToken>,
    ops: &mut [&mut dyn Operation],
    fallback: Option<F>,
) {
    for op in ops.iter_mut() {
        if op.try_execute() {
            return;
        }
    }

    if let Some(fallback) = fallback {
        fallback();
        return;
    }

    let commit = Commit::new();

    let _registration = match token {
        Some(token) => {
            let commit = Arc::clone(&commit);
            match token.on_stop(Box::new(move || {
                commit.claim();
            })) {
                Some(registration) => Some(registration),
                // Canceled before anything was scheduled: no operation commits.
                None => return,
            }
        }
        None => None,
    };

    for op in ops.iter_mut() {
        op.schedule(Commit::abort_fn(&commit));
    }
    commit.signal.wait();
}

/// Commits exactly one of `ops`.
///
/// Each operation is first attempted in the order given; the first that is
/// ready settles and the rest are never attempted. If none is ready, all of
/// them are parked on their channels and the call blocks until one settles,
/// which aborts the others.
pub fn select(ops: &mut [&mut dyn Operation]) {
    run_select(None, ops, None::<fn()>);
}

/// Like [`select`], but `token` tripping unblocks the call with no operation
/// committed.
pub fn select_with(token: &StopToken, ops: &mut [&mut dyn Operation]) {
    run_select(Some(token), ops, None::<fn()>);
}

/// Like [`select`], but if no operation is immediately ready, invokes
/// `fallback` instead of blocking and commits nothing.
pub fn select_or<F: FnOnce()>(ops: &mut [&mut dyn Operation], fallback: F) {
    run_select(None, ops, Some(fallback));
}

/// Combines [`select_with`] and [`select_or`].
pub fn select_with_or<F: FnOnce()>(token: &StopToken, ops: &mut [&mut dyn Operation], fallback: F) {
    run_select(Some(token), ops, Some(fallback));
}
