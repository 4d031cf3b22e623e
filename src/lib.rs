//! Blocking multi-producer multi-consumer channels with a multi-way select.
//!
//! This crate provides typed, thread-safe channels in three buffering
//! regimes, together with operation wrappers and a [`select`] coordinator
//! that waits on several channel operations at once and commits exactly one.
//!
//! # Key Features
//!
//! - **Three capacity regimes**: zero-capacity rendezvous, fixed-capacity
//!   bounded, and unbounded channels behind one operation set.
//! - **Multi-producer multi-consumer**: both halves of every channel clone.
//! - **Blocking with cancellation**: `send`/`recv` park the calling thread
//!   and unpark on delivery, on [`close`](bounded::Sender::close), or when a
//!   [`StopToken`] trips.
//! - **Deferred operations**: callback-driven registrations that settle a
//!   waiter from whichever thread completes the handoff.
//! - **Select**: wait on any mix of sends and receives across channels, with
//!   an optional fallback and cooperative cancellation.
//!
//! # Example
//!
//! ```rust
//! use savak::{rendezvous, unbounded, recv_then, select};
//! use std::thread;
//!
//! let (tx, rx) = rendezvous::<i32>();
//! thread::spawn(move || {
//!     tx.send(7).unwrap();
//! });
//! assert_eq!(rx.recv().unwrap(), 7);
//!
//! let (tx2, rx2) = unbounded::<&str>();
//! tx2.send("ready").unwrap();
//!
//! let (_tx3, rx3) = rendezvous::<i32>();
//! let mut quiet = recv_then(&rx3, |_| panic!("nothing was sent here"));
//! let mut ready = recv_then(&rx2, |msg| assert_eq!(msg, Some("ready")));
//! select(&mut [&mut quiet, &mut ready]);
//! ```

#![warn(missing_docs)]

/// Error types returned by channel operations.
pub mod error;
/// Channel flavors (bounded, unbounded).
pub mod flavors;
/// Operation wrappers and the select coordinator.
pub mod select;
/// Signal mechanism for thread synchronization.
pub mod signal;
/// Cooperative stop tokens for canceling blocking operations.
pub mod stop;

mod waiter;

pub use error::{RecvError, SendError, TryRecvError, TrySendError};
pub use flavors::bounded;
pub use flavors::unbounded;
pub use flavors::Capacity;
pub use select::{
    recv, recv_then, select, select_or, select_with, select_with_or, send, send_then, Operation,
    RecvOp, SendOp, Sink, Source,
};
pub use stop::{StopRegistration, StopSource, StopToken};
pub use waiter::{AbortFn, RecvCallback, SendCallback};

/// Creates a channel of bounded capacity.
///
/// A capacity of zero yields a rendezvous channel on which every transfer is
/// a direct sender-to-receiver handoff.
pub fn bounded<T: Send + 'static>(cap: usize) -> (bounded::Sender<T>, bounded::Receiver<T>) {
    bounded::channel(cap)
}

/// Creates a zero-capacity rendezvous channel.
pub fn rendezvous<T: Send + 'static>() -> (bounded::Sender<T>, bounded::Receiver<T>) {
    bounded::channel(0)
}

/// Creates a channel of unbounded capacity. Sends on it never block.
pub fn unbounded<T: Send + 'static>() -> (unbounded::Sender<T>, unbounded::Receiver<T>) {
    unbounded::channel()
}
