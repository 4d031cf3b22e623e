//! Channels with a fixed capacity.
//!
//! A capacity of zero removes the buffer entirely: every transfer is a
//! rendezvous in which a sender hands its value directly to a receiver, and
//! whichever side arrives first parks until its counterpart shows up.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{RecvError, SendError, TryRecvError, TrySendError};
use crate::flavors::Capacity;
use crate::select::{Sink, Source};
use crate::stop::StopToken;
use crate::waiter::{
    AbortFn, RecvCallback, RecvPark, RecvWaiter, SendCallback, SendPark, SendWaiter,
};

struct State<T> {
    is_closed: bool,
    buffer: VecDeque<T>,
    send_waiters: VecDeque<SendWaiter<T>>,
    recv_waiters: VecDeque<RecvWaiter<T>>,
}

impl<T> State<T> {
    fn new(cap: usize) -> Self {
        Self {
            is_closed: false,
            buffer: VecDeque::with_capacity(cap),
            send_waiters: VecDeque::new(),
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

    fn prune_send(&mut self) {
        while let Some(waiter) = self.send_waiters.front_mut() {
            if waiter.is_aborted() {
                self.send_waiters.pop_front();
            } else {
                break;
            }
        }
    }

    fn pop_live_recv(&mut self) -> Option<RecvWaiter<T>> {
        self.prune_recv();
        self.recv_waiters.pop_front()
    }

    fn pop_live_send(&mut self) -> Option<SendWaiter<T>> {
        self.prune_send();
        self.send_waiters.pop_front()
    }

    /// Obtains a value: from the buffer, refilling freed slots from parked
    /// senders oldest-first, or, in the rendezvous regime, directly from a
    /// parked sender.
    fn take_value(&mut self, cap: usize) -> Option<T> {
        if let Some(value) = self.buffer.pop_front() {
            while self.buffer.len() < cap {
                match self.pop_live_send() {
                    Some(waiter) => {
                        if let Some(v) = waiter.settle(true) {
                            self.buffer.push_back(v);
                        }
                    }
                    None => break,
                }
            }
            return Some(value);
        }

        while let Some(waiter) = self.pop_live_send() {
            if let Some(v) = waiter.settle(true) {
                return Some(v);
            }
        }
        None
    }

    /// Delivers a value: directly to a parked receiver, else into the buffer.
    fn put_value(&mut self, cap: usize, value: T) -> Result<(), T> {
        if let Some(waiter) = self.pop_live_recv() {
            waiter.settle(Some(value));
            return Ok(());
        }
        if self.buffer.len() < cap {
            self.buffer.push_back(value);
            return Ok(());
        }
        Err(value)
    }
}

struct Channel<T> {
    cap: usize,
    state: Mutex<State<T>>,
}

impl<T: Send + 'static> Channel<T> {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            state: Mutex::new(State::new(cap)),
        }
    }

    fn capacity(&self) -> Capacity {
        if self.cap == 0 {
            Capacity::Zero
        } else {
            Capacity::Bounded(self.cap)
        }
    }

    fn size(&self) -> isize {
        let mut state = self.state.lock().unwrap();
        state.prune_recv();
        state.prune_send();
        state.buffer.len() as isize + state.send_waiters.len() as isize
            - state.recv_waiters.len() as isize
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
        while let Some(waiter) = state.pop_live_send() {
            waiter.settle(false);
        }
    }
}

/// The sending half of a bounded channel.
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

/// The receiving half of a bounded channel.
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

/// Creates a channel of bounded capacity. A capacity of zero yields a
/// rendezvous channel.
pub fn channel<T: Send + 'static>(cap: usize) -> (Sender<T>, Receiver<T>) {
    let inner = Arc::new(Channel::new(cap));
    (
        Sender {
            inner: Arc::clone(&inner),
        },
        Receiver { inner },
    )
}

impl<T: Send + 'static> Sender<T> {
    /// Attempts to send without blocking.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let mut state = self.inner.state.lock().unwrap();
        if state.is_closed {
            return Err(TrySendError::Closed(value));
        }
        state
            .put_value(self.inner.cap, value)
            .map_err(TrySendError::Exhausted)
    }

    /// Sends, blocking until the value is delivered or the channel closes.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        self.send_with(&StopToken::default(), value)
    }

    /// Sends, blocking until the value is delivered, the channel closes, or
    /// `token` trips.
    pub fn send_with(&self, token: &StopToken, value: T) -> Result<(), SendError<T>> {
        let mut state = self.inner.state.lock().unwrap();
        if token.is_stopped() {
            return Err(SendError::Canceled(value));
        }
        if state.is_closed {
            return Err(SendError::Closed(value));
        }
        let value = match state.put_value(self.inner.cap, value) {
            Ok(()) => return Ok(()),
            Err(value) => value,
        };

        let park = Arc::new(SendPark::new(value));
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
            park.cancel();
            return park.wait();
        };

        let abort = {
            let finished = Arc::clone(&finished);
            Box::new(move || finished.load(Ordering::Relaxed))
        };
        let settle = {
            let park = Arc::clone(&park);
            Box::new(move |ok: bool| {
                finished.store(true, Ordering::Relaxed);
                park.settle(ok)
            })
        };
        state.send_waiters.push_back(SendWaiter::new(abort, settle));
        drop(state);

        park.wait()
    }

    /// Registers a deferred send of `value`: settles immediately when the
    /// value can be delivered or the channel is closed, otherwise parks a
    /// waiter carrying `abort` and `on_settle`.
    ///
    /// `on_settle` runs under the channel lock on whichever thread completes
    /// the settlement; it must not call back into the channel.
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
        if state.buffer.len() < self.inner.cap {
            if !abort() {
                state.buffer.push_back(value);
                on_settle(true);
            }
            return;
        }

        let settle = Box::new(move |ok: bool| {
            if ok {
                on_settle(true);
                Some(value)
            } else {
                on_settle(false);
                None
            }
        });
        state.send_waiters.push_back(SendWaiter::new(abort, settle));
    }

    /// Returns the buffered length plus parked senders minus parked
    /// receivers; negative when receivers are hanging.
    pub fn size(&self) -> isize {
        self.inner.size()
    }

    /// Returns the channel's buffering regime.
    pub fn capacity(&self) -> Capacity {
        self.inner.capacity()
    }

    /// Closes the channel, waking every parked party. Idempotent.
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
        state
            .take_value(self.inner.cap)
            .ok_or(TryRecvError::Exhausted)
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
        if let Some(value) = state.take_value(self.inner.cap) {
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
    /// obtainable or the channel is closed, otherwise parks a waiter carrying
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
            if let Some(value) = state.take_value(self.inner.cap) {
                on_settle(Some(value));
            }
            return;
        }
        if let Some(value) = state.take_value(self.inner.cap) {
            on_settle(Some(value));
            return;
        }
        state.recv_waiters.push_back(RecvWaiter::new(abort, on_settle));
    }

    /// Returns the buffered length plus parked senders minus parked
    /// receivers; negative when receivers are hanging.
    pub fn size(&self) -> isize {
        self.inner.size()
    }

    /// Returns the channel's buffering regime.
    pub fn capacity(&self) -> Capacity {
        self.inner.capacity()
    }

    /// Closes the channel, waking every parked party. Idempotent.
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
