// Error taxonomy and operation outcomes.
//
// Only construction failures and cancellation are hard errors. Timeouts and
// immediate unavailability are ordinary outcomes that hand the value back.
use std::error::Error;
use std::fmt;

/// Construction-time failure of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("invalid capacity {0}: a bounded buffer needs at least one slot")]
    InvalidCapacity(usize),
}

/// A textual selector (strategy, access mode) that names nothing known.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseError {
    kind: &'static str,
    value: String,
}

impl ParseError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        ParseError {
            kind,
            value: value.to_string(),
        }
    }
}

/// The waiting thread was cancelled before the operation took effect.
///
/// Carries the value a `put` could not store; `get` uses `Cancelled<()>`.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Cancelled<T = ()>(pub T);

impl<T> Cancelled<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Cancelled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cancelled(..)")
    }
}

impl<T> fmt::Display for Cancelled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation cancelled while waiting")
    }
}

impl<T> Error for Cancelled<T> {}

/// Failure of a bounded-wait enqueue. The value was not stored.
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum OfferError<T> {
    /// The deadline passed while the buffer stayed full.
    Timeout(T),
    /// The waiting thread was cancelled.
    Cancelled(T),
}

impl<T> OfferError<T> {
    pub fn into_inner(self) -> T {
        match self {
            OfferError::Timeout(v) | OfferError::Cancelled(v) => v,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, OfferError::Timeout(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OfferError::Cancelled(_))
    }
}

impl<T> From<Cancelled<T>> for OfferError<T> {
    fn from(err: Cancelled<T>) -> Self {
        OfferError::Cancelled(err.0)
    }
}

impl<T> fmt::Debug for OfferError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferError::Timeout(_) => f.write_str("Timeout(..)"),
            OfferError::Cancelled(_) => f.write_str("Cancelled(..)"),
        }
    }
}

impl<T> fmt::Display for OfferError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferError::Timeout(_) => f.write_str("timed out waiting for a free slot"),
            OfferError::Cancelled(_) => f.write_str("cancelled while waiting for a free slot"),
        }
    }
}

impl<T> Error for OfferError<T> {}

/// Failure of a bounded-wait dequeue. Nothing was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("timed out waiting for an item")]
    Timeout,
    #[error("cancelled while waiting for an item")]
    Cancelled,
}

impl PollError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::Timeout)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PollError::Cancelled)
    }
}

impl From<Cancelled> for PollError {
    fn from(_: Cancelled) -> Self {
        PollError::Cancelled
    }
}
