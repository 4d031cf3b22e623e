use std::error::Error;
use std::fmt;

/// Error returned by a non-blocking receive attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    /// No value is currently obtainable; a later attempt may succeed.
    Exhausted,
    /// The channel is closed.
    Closed,
}

impl fmt::Display for TryRecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryRecvError::Exhausted => write!(f, "receiving on an exhausted channel"),
            TryRecvError::Closed => write!(f, "receiving on a closed channel"),
        }
    }
}

impl Error for TryRecvError {}

/// Error returned by a blocking receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvError {
    /// The channel is closed.
    Closed,
    /// The caller's stop token tripped before a value arrived.
    Canceled,
}

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecvError::Closed => write!(f, "receiving on a closed channel"),
            RecvError::Canceled => write!(f, "receive canceled"),
        }
    }
}

impl Error for RecvError {}

/// Error returned by a non-blocking send attempt. Carries the rejected value.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum TrySendError<T> {
    /// The channel cannot accept a value right now; a later attempt may succeed.
    Exhausted(T),
    /// The channel is closed.
    Closed(T),
}

impl<T> TrySendError<T> {
    /// Returns the value that could not be sent.
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Exhausted(v) | TrySendError::Closed(v) => v,
        }
    }

    /// Returns true if the send failed because the channel is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, TrySendError::Closed(_))
    }
}

impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Exhausted(_) => write!(f, "Exhausted(..)"),
            TrySendError::Closed(_) => write!(f, "Closed(..)"),
        }
    }
}

impl<T> fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Exhausted(_) => write!(f, "sending on an exhausted channel"),
            TrySendError::Closed(_) => write!(f, "sending on a closed channel"),
        }
    }
}

impl<T> Error for TrySendError<T> {}

/// Error returned by a blocking send. Carries the undelivered value.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum SendError<T> {
    /// The channel is closed.
    Closed(T),
    /// The caller's stop token tripped before the value was delivered.
    Canceled(T),
}

impl<T> SendError<T> {
    /// Returns the value that was not delivered.
    pub fn into_inner(self) -> T {
        match self {
            SendError::Closed(v) | SendError::Canceled(v) => v,
        }
    }

    /// Returns true if the send failed because the channel is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, SendError::Closed(_))
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Closed(_) => write!(f, "Closed(..)"),
            SendError::Canceled(_) => write!(f, "Canceled(..)"),
        }
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Closed(_) => write!(f, "sending on a closed channel"),
            SendError::Canceled(_) => write!(f, "send canceled"),
        }
    }
}

impl<T> Error for SendError<T> {}
