//! # Protected bounded buffers.
//!
//! A fixed-capacity FIFO queue shared by any number of producer and consumer
//! threads, offered in two interchangeable synchronization strategies:
//!
//! | Strategy                | Full/empty waiting                       | Ring access            |
//! |-------------------------|------------------------------------------|------------------------|
//! | [`MonitorBuffer`]       | "not full" / "not empty" condition vars  | same lock as waiting   |
//! | [`SemaphoreBuffer`]     | empty-slot / full-slot [`Semaphore`]s    | short separate lock    |
//!
//! Both implement [`BoundedBuffer`], so callers pick a strategy once, through
//! [`new_buffer`], and never again care which one they hold:
//!
//! | Operation | While full / empty          | On failure                  |
//! |-----------|-----------------------------|-----------------------------|
//! | `put`     | blocks                      | -                           |
//! | `get`     | blocks                      | -                           |
//! | `offer`   | blocks until the deadline   | `OfferError::Timeout(value)` |
//! | `poll`    | blocks until the deadline   | `PollError::Timeout`        |
//! | `add`     | returns immediately         | `Err(value)`                |
//! | `remove`  | returns immediately         | `None`                      |
//!
//! Values leave in the order they entered, whichever threads moved them.
//!
//! Waiting operations have `*_cancellable` forms taking a [`CancelToken`]. A
//! cancelled operation returns without having touched the buffer.
//!
//! ```
//! use pbuf_buffer::{new_buffer, BoundedBuffer, Strategy};
//!
//! let buffer = new_buffer::<u32>(Strategy::Semaphore, 2).unwrap();
//! buffer.put(1);
//! assert_eq!(buffer.add(2), Ok(()));
//! assert_eq!(buffer.add(3), Err(3));
//! assert_eq!(buffer.get(), 1);
//! ```
use std::sync::Arc;
use std::time::{Duration, Instant};

mod activity;
pub mod cancel;
mod monitor;
mod ring;
pub mod semaphore;
mod semaphore_buffer;
mod wait;

pub use cancel::{CancelToken, CANCEL_POLL_INTERVAL};
pub use monitor::MonitorBuffer;
pub use semaphore::Semaphore;
pub use semaphore_buffer::SemaphoreBuffer;

// Re-export the shared vocabulary so callers need a single import
pub use pbuf_core::{
    AccessMode, BufferError, Cancelled, OfferError, Operation, PollError, Strategy,
};

/// A buffer shared between threads, strategy chosen at construction.
pub type SharedBuffer<T> = Arc<dyn BoundedBuffer<T>>;

const NEVER: CancelToken = CancelToken::never();

/// The six-operation bounded buffer contract.
pub trait BoundedBuffer<T>: Send + Sync {
    /// Stores `value`, waiting while the buffer is full, unless `cancel` fires first.
    fn put_cancellable(&self, value: T, cancel: &CancelToken) -> Result<(), Cancelled<T>>;

    /// Takes the oldest value, waiting while the buffer is empty, unless `cancel` fires first.
    fn get_cancellable(&self, cancel: &CancelToken) -> Result<T, Cancelled>;

    /// Stores `value`, waiting while the buffer is full but not past `deadline`.
    fn offer_cancellable(
        &self,
        value: T,
        deadline: Instant,
        cancel: &CancelToken,
    ) -> Result<(), OfferError<T>>;

    /// Takes the oldest value, waiting while the buffer is empty but not past `deadline`.
    fn poll_cancellable(&self, deadline: Instant, cancel: &CancelToken) -> Result<T, PollError>;

    /// Stores `value` if a slot is free right now; hands it back otherwise.
    fn add(&self, value: T) -> Result<(), T>;

    /// Takes the oldest value if there is one right now.
    fn remove(&self) -> Option<T>;

    /// Number of stored values. Only a snapshot under concurrent use.
    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn strategy(&self) -> Strategy;

    fn put(&self, value: T) {
        if self.put_cancellable(value, &NEVER).is_err() {
            unreachable!("put cancelled through a token that never fires");
        }
    }

    fn get(&self) -> T {
        match self.get_cancellable(&NEVER) {
            Ok(value) => value,
            Err(_) => unreachable!("get cancelled through a token that never fires"),
        }
    }

    /// A deadline already in the past makes this a plain [`BoundedBuffer::add`]
    /// that reports `Timeout`.
    fn offer(&self, value: T, deadline: Instant) -> Result<(), OfferError<T>> {
        self.offer_cancellable(value, deadline, &NEVER)
    }

    fn poll(&self, deadline: Instant) -> Result<T, PollError> {
        self.poll_cancellable(deadline, &NEVER)
    }

    /// A timeout too large to express as an `Instant` waits without limit.
    fn offer_for(&self, value: T, timeout: Duration) -> Result<(), OfferError<T>> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.offer(value, deadline),
            None => {
                self.put(value);
                Ok(())
            }
        }
    }

    fn poll_for(&self, timeout: Duration) -> Result<T, PollError> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.poll(deadline),
            None => Ok(self.get()),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }
}

/// Builds a buffer of `capacity` slots protected by `strategy`.
pub fn new_buffer<T: Send + 'static>(
    strategy: Strategy,
    capacity: usize,
) -> Result<SharedBuffer<T>, BufferError> {
    Ok(match strategy {
        Strategy::Monitor => Arc::new(MonitorBuffer::new(capacity)?),
        Strategy::Semaphore => Arc::new(SemaphoreBuffer::new(capacity)?),
    })
}
