//! Channels with no capacity limit.
//!
//! Sends never park: a value is handed to a parked receiver if one exists
//! and buffered otherwise. Only the receive side can suspend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{RecvError, SendError, TryRecvError, TrySendError};
use crate::flavors::Capacity;
use crate::select::{Sink, Source};
use crate::stop::StopToken;
use crate::waiter::{AbortFn, RecvCallback, RecvPark, RecvWaiter, SendCallback};

struct State<T> {
    is_closed: bool,
    buffer: VecDeque<T>,
    recv_waiters: VecDeque<RecvWaiter<T>>,
}

impl<T> State<T> {
    fn new() -> Self {
        Self {
            is_closed: false,
            buffer: VecDeque::new(),
            recv_waiters: VecDeque::new(),
        }
    }

    fn prune_recv(&mut self) {
        while let Some(waiter) = self.recv_waiters.front_mut() {
            if waiter.is_aborted() {
                self.recv_waiters.pop_front();
            } else {
                break;
            }
        }
    }

    fn pop_live_recv(&mut self) -> Option<RecvWaiter<T>> {
        self.prune_recv();
        self.recv_waiters.pop_front()
    }

    /// Delivers a value: directly to a parked receiver, else into the buffer.
    /// Never fails.
    fn put_value(&mut self, value: T) {
        if let Some(waiter) = self.pop_live_recv() {
            waiter.settle(Some(value));
            return;
        }
        self.buffer.push_back(value);
    }
}

struct Channel<T> {
    state: Mutex<State<T>>,
}

impl<T: Send + 'static> Channel<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(State::new()),
        }
    }

    fn size(&self) -> isize {
        let mut state = self.state.lock().unwrap();
        state.prune_recv();
        state.buffer.len() as isize - state.recv_waiters.len() as isize
    }

    fn close(&self) {
        let mut state = self.state.lock().unwrap();
        if state.is_closed {
            return;
        }
        state.is_closed = true;
        while let Some(waiter) = state.pop_live_recv() {
            waiter.settle(None);
        }
    }
}

/// The sending half of an unbounded channel.
pub struct Sender<T: Send + 'static> {
    inner: Arc<Channel<T>>,
}

impl<T: Send + 'static> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// The receiving half of an unbounded channel.
pub struct Receiver<T: Send + 'static> {
    inner: Arc<Channel<T>>,
}

impl<T: Send + 'static> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Creates a channel of unbounded capacity.
pub fn channel<T: Send + 'static>() -> (Sender<T>, Receiver<T>) {
    let inner = Arc::new(Channel::new());
    (
        Sender {
            inner: Arc::clone(&inner),
        },
        Receiver { inner },
    )
}

impl<T: Send + 'static> Sender<T> {
    /// Attempts to send without blocking. Only fails on a closed channel.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let mut state = self.inner.state.lock().unwrap();
        if state.is_closed {
            return Err(TrySendError::Closed(value));
        }
        state.put_value(value);
        Ok(())
    }

    /// Sends the value. Never parks.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        self.send_with(&StopToken::default(), value)
    }

    /// Sends the value unless `token` has already tripped. Never parks.
    pub fn send_with(&self, token: &StopToken, value: T) -> Result<(), SendError<T>> {
        let mut state = self.inner.state.lock().unwrap();
        if token.is_stopped() {
            return Err(SendError::Canceled(value));
        }
        if state.is_closed {
            return Err(SendError::Closed(value));
        }
        state.put_value(value);
        Ok(())
    }

    /// Registers a deferred send of `value`. Always settles synchronously:
    /// with `true` once the value is delivered or buffered, with `false` on a
    /// closed channel, or not at all if `abort` answers that the operation
    /// lost interest.
    pub fn send_deferred(&self, value: T, mut abort: AbortFn, on_settle: SendCallback) {
        let mut state = self.inner.state.lock().unwrap();
        if state.is_closed {
            if !abort() {
                on_settle(false);
            }
            return;
        }
        if let Some(waiter) = state.pop_live_recv() {
            waiter.settle(Some(value));
            on_settle(true);
            return;
        }
        if !abort() {
            state.buffer.push_back(value);
            on_settle(true);
        }
    }

    /// Returns the buffered length minus parked receivers; negative when
    /// receivers are hanging.
    pub fn size(&self) -> isize {
        self.inner.size()
    }

    /// Returns [`Capacity::Unbounded`].
    pub fn capacity(&self) -> Capacity {
        Capacity::Unbounded
    }

    /// Closes the channel, waking every parked receiver. Idempotent.
    pub fn close(&self) {
        self.inner.close();
    }
}

impl<T: Send + 'static> Receiver<T> {
    /// Attempts to receive without blocking.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        let mut state = self.inner.state.lock().unwrap();
        if state.is_closed {
            return Err(TryRecvError::Closed);
        }
        state.buffer.pop_front().ok_or(TryRecvError::Exhausted)
    }

    /// Receives, blocking until a value arrives or the channel closes.
    pub fn recv(&self) -> Result<T, RecvError> {
        self.recv_with(&StopToken::default())
    }

    /// Receives, blocking until a value arrives, the channel closes, or
    /// `token` trips.
    pub fn recv_with(&self, token: &StopToken) -> Result<T, RecvError> {
        let mut state = self.inner.state.lock().unwrap();
        if token.is_stopped() {
            return Err(RecvError::Canceled);
        }
        if state.is_closed {
            return Err(RecvError::Closed);
        }
        if let Some(value) = state.buffer.pop_front() {
            return Ok(value);
        }

        let park = Arc::new(RecvPark::new());
        let finished = Arc::new(AtomicBool::new(false));

        let registration = {
            let park = Arc::clone(&park);
            let finished = Arc::clone(&finished);
            let chan = Arc::clone(&self.inner);
            token.on_stop(Box::new(move || {
                let _state = chan.state.lock().unwrap();
                if finished.swap(true, Ordering::Relaxed) {
                    return;
                }
                park.cancel();
            }))
        };
        let Some(_registration) = registration else {
            return Err(RecvError::Canceled);
        };

        let abort = {
            let finished = Arc::clone(&finished);
            Box::new(move || finished.load(Ordering::Relaxed))
        };
        let settle = {
            let park = Arc::clone(&park);
            Box::new(move |value: Option<T>| {
                finished.store(true, Ordering::Relaxed);
                park.settle(value);
            })
        };
        state.recv_waiters.push_back(RecvWaiter::new(abort, settle));
        drop(state);

        park.wait()
    }

    /// Registers a deferred receive: settles immediately when a value is
    /// buffered or the channel is closed, otherwise parks a waiter carrying
    /// `abort` and `on_settle`.
    ///
    /// `on_settle` runs under the channel lock on whichever thread completes
    /// the settlement; it must not call back into the channel.
    pub fn recv_deferred(&self, mut abort: AbortFn, on_settle: RecvCallback<T>) {
        let mut state = self.inner.state.lock().unwrap();
        if state.is_closed {
            if !abort() {
                on_settle(None);
            }
            return;
        }
        if !state.buffer.is_empty() {
            if abort() {
                return;
            }
            if let Some(value) = state.buffer.pop_front() {
                on_settle(Some(value));
            }
            return;
        }
        state.recv_waiters.push_back(RecvWaiter::new(abort, on_settle));
    }

    /// Returns the buffered length minus parked receivers; negative when
    /// receivers are hanging.
    pub fn size(&self) -> isize {
        self.inner.size()
    }

    /// Returns [`Capacity::Unbounded`].
    pub fn capacity(&self) -> Capacity {
        Capacity::Unbounded
    }

    /// Closes the channel, waking every parked receiver. Idempotent.
    pub fn close(&self) {
        self.inner.close();
    }
}

impl<T: Send + 'static> Source<T> for Receiver<T> {
    fn try_recv(&self) -> Result<T, TryRecvError> {
        Receiver::try_recv(self)
    }

    fn recv_deferred(&self, abort: AbortFn, on_settle: RecvCallback<T>) {
        Receiver::recv_deferred(self, abort, on_settle);
    }
}

impl<T: Send + 'static> Sink<T> for Sender<T> {
    fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        Sender::try_send(self, value)
    }

    fn send_deferred(&self, value: T, abort: AbortFn, on_settle: SendCallback) {
        Sender::send_deferred(self, value, abort, on_settle);
    }
}
