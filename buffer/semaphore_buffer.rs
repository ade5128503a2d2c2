// Semaphore-based buffer: `empty_slots` / `full_slots` decide who may proceed,
// the lock only serializes the ring mutation itself.
//
// The lock is never held while acquiring a semaphore. Once a permit is taken
// the ring operation cannot fail; if it does the permit accounting is broken
// and we panic rather than run on with a corrupted count.
use std::time::Instant;

use parking_lot::Mutex;
use pbuf_core::{BufferError, Cancelled, OfferError, Operation, PollError, Strategy};

use crate::activity::{self, Outcome};
use crate::cancel::CancelToken;
use crate::ring::RingStorage;
use crate::semaphore::Semaphore;
use crate::BoundedBuffer;

pub struct SemaphoreBuffer<T> {
    ring: Mutex<RingStorage<T>>,
    empty_slots: Semaphore,
    full_slots: Semaphore,
}

impl<T> SemaphoreBuffer<T> {
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::InvalidCapacity(capacity));
        }
        tracing::debug!(capacity, strategy = "semaphore", "buffer created");
        Ok(SemaphoreBuffer {
            ring: Mutex::new(RingStorage::new(capacity)),
            empty_slots: Semaphore::new(capacity),
            full_slots: Semaphore::new(0),
        })
    }

    /// Free permits on the empty-slot and full-slot semaphores.
    pub fn permits(&self) -> (usize, usize) {
        (
            self.empty_slots.available_permits(),
            self.full_slots.available_permits(),
        )
    }

    // Caller holds an `empty_slots` permit.
    fn store(&self, op: Operation, value: T) {
        let len = {
            let mut ring = self.ring.lock();
            if ring.try_push(value).is_err() {
                panic!("{op}: empty-slot permit held but the ring is full");
            }
            ring.len()
        };
        self.full_slots.release();
        activity::record(Strategy::Semaphore, op, Outcome::Done, len);
    }

    // Caller holds a `full_slots` permit.
    fn take(&self, op: Operation) -> T {
        let (value, len) = {
            let mut ring = self.ring.lock();
            let Some(value) = ring.try_pop() else {
                panic!("{op}: full-slot permit held but the ring is empty");
            };
            (value, ring.len())
        };
        self.empty_slots.release();
        activity::record(Strategy::Semaphore, op, Outcome::Done, len);
        value
    }

    fn record_miss(&self, op: Operation, outcome: Outcome) {
        activity::record(Strategy::Semaphore, op, outcome, self.ring.lock().len());
    }
}

impl<T: Send> BoundedBuffer<T> for SemaphoreBuffer<T> {
    fn put_cancellable(&self, value: T, cancel: &CancelToken) -> Result<(), Cancelled<T>> {
        match self.empty_slots.acquire_cancellable(cancel) {
            Ok(()) => {
                self.store(Operation::Put, value);
                Ok(())
            }
            Err(Cancelled(())) => {
                self.record_miss(Operation::Put, Outcome::Cancelled);
                Err(Cancelled(value))
            }
        }
    }

    fn get_cancellable(&self, cancel: &CancelToken) -> Result<T, Cancelled> {
        match self.full_slots.acquire_cancellable(cancel) {
            Ok(()) => Ok(self.take(Operation::Get)),
            Err(cancelled) => {
                self.record_miss(Operation::Get, Outcome::Cancelled);
                Err(cancelled)
            }
        }
    }

    fn offer_cancellable(
        &self,
        value: T,
        deadline: Instant,
        cancel: &CancelToken,
    ) -> Result<(), OfferError<T>> {
        match self.empty_slots.acquire_until_cancellable(deadline, cancel) {
            Ok(true) => {
                self.store(Operation::Offer, value);
                Ok(())
            }
            Ok(false) => {
                self.record_miss(Operation::Offer, Outcome::TimedOut);
                Err(OfferError::Timeout(value))
            }
            Err(Cancelled(())) => {
                self.record_miss(Operation::Offer, Outcome::Cancelled);
                Err(OfferError::Cancelled(value))
            }
        }
    }

    fn poll_cancellable(&self, deadline: Instant, cancel: &CancelToken) -> Result<T, PollError> {
        match self.full_slots.acquire_until_cancellable(deadline, cancel) {
            Ok(true) => Ok(self.take(Operation::Poll)),
            Ok(false) => {
                self.record_miss(Operation::Poll, Outcome::TimedOut);
                Err(PollError::Timeout)
            }
            Err(Cancelled(())) => {
                self.record_miss(Operation::Poll, Outcome::Cancelled);
                Err(PollError::Cancelled)
            }
        }
    }

    fn add(&self, value: T) -> Result<(), T> {
        if !self.empty_slots.try_acquire() {
            self.record_miss(Operation::Add, Outcome::Unavailable);
            return Err(value);
        }
        self.store(Operation::Add, value);
        Ok(())
    }

    fn remove(&self) -> Option<T> {
        if !self.full_slots.try_acquire() {
            self.record_miss(Operation::Remove, Outcome::Unavailable);
            return None;
        }
        Some(self.take(Operation::Remove))
    }

    fn len(&self) -> usize {
        self.ring.lock().len()
    }

    fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    fn strategy(&self) -> Strategy {
        Strategy::Semaphore
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn permits_track_contents() {
        let buffer = SemaphoreBuffer::<char>::new(3).unwrap();
        assert_eq!(buffer.permits(), (3, 0));
        buffer.put('x');
        buffer.put('y');
        assert_eq!(buffer.permits(), (1, 2));
        assert_eq!(buffer.get(), 'x');
        assert_eq!(buffer.permits(), (2, 1));
    }

    #[test]
    fn failed_add_and_remove_leave_permits_alone() {
        let buffer: SemaphoreBuffer<u8> = SemaphoreBuffer::new(1).unwrap();
        assert_eq!(buffer.remove(), None);
        assert_eq!(buffer.permits(), (1, 0));
        assert_eq!(buffer.add(1), Ok(()));
        assert_eq!(buffer.add(2), Err(2));
        assert_eq!(buffer.permits(), (0, 1));
    }

    #[test]
    fn cancelled_put_returns_its_permit_untaken() {
        let buffer = Arc::new(SemaphoreBuffer::<u32>::new(1).unwrap());
        buffer.put(10u32);
        let cancel = CancelToken::new();

        let producer = {
            let (buffer, cancel) = (Arc::clone(&buffer), cancel.clone());
            thread::spawn(move || buffer.put_cancellable(11, &cancel))
        };
        thread::sleep(Duration::from_millis(30));
        cancel.cancel();

        assert_eq!(producer.join().unwrap(), Err(Cancelled(11)));
        assert_eq!(buffer.permits(), (0, 1));
        assert_eq!(buffer.remove(), Some(10));
        assert_eq!(buffer.permits(), (1, 0));
    }

    #[test]
    fn timed_out_poll_leaves_permits_alone() {
        let buffer: SemaphoreBuffer<u8> = SemaphoreBuffer::new(2).unwrap();
        let deadline = Instant::now() + Duration::from_millis(20);
        assert_eq!(buffer.poll(deadline), Err(PollError::Timeout));
        assert_eq!(buffer.permits(), (2, 0));
    }
}
