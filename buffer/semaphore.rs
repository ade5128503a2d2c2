//! # Counting semaphore.
//!
//! A **semaphore** holds a non-negative number of permits. Acquiring takes one
//! permit, blocking while none is available; releasing returns one and wakes
//! a blocked acquirer, if any.
//!
//! The semaphore-based buffer uses two of them: one counting empty slots
//! (initialized to the capacity) and one counting full slots (initialized to
//! zero). A producer acquires an empty slot and releases a full one; a
//! consumer does the opposite. The permit count is therefore the only thing
//! that decides whether a caller may touch the ring at all.
//!
//! The standard library has no semaphore, so this one is built from a
//! [`parking_lot::Mutex`] guarding the count and a [`parking_lot::Condvar`]
//! that acquirers sleep on:
//!
//! - [`Semaphore::acquire`] blocks until a permit is available.
//! - [`Semaphore::try_acquire`] takes a permit only if one is available now.
//! - [`Semaphore::acquire_until`] blocks, but no later than a deadline.
//! - [`Semaphore::release`] returns a permit and wakes one acquirer.
//!
//! Every waiting acquire also comes in a cancellable form. A cancelled
//! acquire never takes a permit.
//!
//! ```
//! use pbuf_buffer::Semaphore;
//!
//! let sem = Semaphore::new(1);
//! sem.acquire();
//! assert!(!sem.try_acquire());
//! sem.release();
//! assert_eq!(sem.available_permits(), 1);
//! ```
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use pbuf_core::Cancelled;

use crate::cancel::CancelToken;
use crate::wait::{wait_while, WaitOutcome};

/// Counting semaphore.
pub struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    /// Creates a semaphore holding `permits` permits.
    pub fn new(permits: usize) -> Self {
        Semaphore {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Waits until a permit becomes available and then takes it.
    pub fn acquire(&self) {
        let outcome = self.acquire_inner(None, &CancelToken::never());
        debug_assert_eq!(outcome, WaitOutcome::Ready);
    }

    /// Like [`Semaphore::acquire`], but gives up when `cancel` fires.
    pub fn acquire_cancellable(&self, cancel: &CancelToken) -> Result<(), Cancelled> {
        match self.acquire_inner(None, cancel) {
            WaitOutcome::Ready => Ok(()),
            WaitOutcome::Cancelled => Err(Cancelled(())),
            WaitOutcome::TimedOut => unreachable!("acquire without a deadline timed out"),
        }
    }

    /// Takes a permit if one is available right now. Never blocks.
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Waits for a permit until `deadline`. Returns whether one was taken.
    pub fn acquire_until(&self, deadline: Instant) -> bool {
        self.acquire_inner(Some(deadline), &CancelToken::never()) == WaitOutcome::Ready
    }

    /// Like [`Semaphore::acquire_until`], but gives up when `cancel` fires.
    pub fn acquire_until_cancellable(
        &self,
        deadline: Instant,
        cancel: &CancelToken,
    ) -> Result<bool, Cancelled> {
        match self.acquire_inner(Some(deadline), cancel) {
            WaitOutcome::Ready => Ok(true),
            WaitOutcome::TimedOut => Ok(false),
            WaitOutcome::Cancelled => Err(Cancelled(())),
        }
    }

    /// Returns a permit and wakes one blocked acquirer, if any.
    pub fn release(&self) {
        {
            let mut permits = self.permits.lock();
            *permits += 1;
        }
        self.available.notify_one();
    }

    /// Number of permits that could be taken right now.
    pub fn available_permits(&self) -> usize {
        *self.permits.lock()
    }

    fn acquire_inner(&self, deadline: Option<Instant>, cancel: &CancelToken) -> WaitOutcome {
        let mut permits = self.permits.lock();
        let outcome = wait_while(&self.available, &mut permits, deadline, cancel, |p| *p == 0);
        if outcome == WaitOutcome::Ready {
            *permits -= 1;
        }
        outcome
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Semaphore")
            .field("permits", &self.available_permits())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn counts_permits() {
        let sem = Semaphore::new(2);
        assert!(sem.try_acquire());
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());
        assert_eq!(sem.available_permits(), 0);
        sem.release();
        assert_eq!(sem.available_permits(), 1);
    }

    #[test]
    fn acquire_until_times_out_without_taking_a_permit() {
        let sem = Semaphore::new(0);
        let start = Instant::now();
        assert!(!sem.acquire_until(start + Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(sem.available_permits(), 0);
    }

    #[test]
    fn acquire_until_in_the_past_is_a_try() {
        let sem = Semaphore::new(1);
        let past = Instant::now() - Duration::from_millis(5);
        assert!(sem.acquire_until(past));
        assert!(!sem.acquire_until(past));
    }

    #[test]
    fn release_wakes_blocked_acquirer() {
        let sem = Arc::new(Semaphore::new(0));
        let (done_tx, done_rx) = channel::bounded(1);

        let waiter = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || {
                sem.acquire();
                done_tx.send(()).unwrap();
            })
        };

        assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());
        sem.release();
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        waiter.join().unwrap();
        assert_eq!(sem.available_permits(), 0);
    }

    #[test]
    fn cancelled_acquire_leaves_count_untouched() {
        let sem = Arc::new(Semaphore::new(0));
        let cancel = CancelToken::new();

        let waiter = {
            let (sem, cancel) = (Arc::clone(&sem), cancel.clone());
            thread::spawn(move || sem.acquire_cancellable(&cancel))
        };

        thread::sleep(Duration::from_millis(30));
        cancel.cancel();
        assert_eq!(waiter.join().unwrap(), Err(Cancelled(())));
        assert_eq!(sem.available_permits(), 0);

        // A cancelled token does not stop an acquire that can proceed.
        sem.release();
        assert_eq!(sem.acquire_cancellable(&cancel), Ok(()));
        assert_eq!(
            sem.acquire_until_cancellable(Instant::now() + Duration::from_secs(1), &cancel),
            Err(Cancelled(()))
        );
    }

    #[test]
    fn permits_are_conserved_under_contention() {
        let sem = Arc::new(Semaphore::new(3));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sem = Arc::clone(&sem);
                thread::spawn(move || {
                    for _ in 0..500 {
                        sem.acquire();
                        sem.release();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sem.available_permits(), 3);
    }
}
