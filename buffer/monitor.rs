// Monitor-based buffer: one lock around the ring, one condition variable per
// predicate ("not full" for producers, "not empty" for consumers).
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use pbuf_core::{BufferError, Cancelled, OfferError, Operation, PollError, Strategy};

use crate::activity::{self, Outcome};
use crate::cancel::CancelToken;
use crate::ring::RingStorage;
use crate::wait::{wait_while, WaitOutcome};
use crate::BoundedBuffer;

pub struct MonitorBuffer<T> {
    ring: Mutex<RingStorage<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> MonitorBuffer<T> {
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::InvalidCapacity(capacity));
        }
        tracing::debug!(capacity, strategy = "monitor", "buffer created");
        Ok(MonitorBuffer {
            ring: Mutex::new(RingStorage::new(capacity)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        })
    }

    fn enqueue(
        &self,
        op: Operation,
        value: T,
        deadline: Option<Instant>,
        cancel: &CancelToken,
    ) -> Result<(), (WaitOutcome, T)> {
        let mut ring = self.ring.lock();
        let outcome = wait_while(&self.not_full, &mut ring, deadline, cancel, RingStorage::is_full);
        if outcome != WaitOutcome::Ready {
            activity::record(Strategy::Monitor, op, outcome.into(), ring.len());
            return Err((outcome, value));
        }
        if ring.try_push(value).is_err() {
            unreachable!("ring rejected a push after reporting a free slot");
        }
        self.not_empty.notify_one();
        activity::record(Strategy::Monitor, op, Outcome::Done, ring.len());
        Ok(())
    }

    fn dequeue(
        &self,
        op: Operation,
        deadline: Option<Instant>,
        cancel: &CancelToken,
    ) -> Result<T, WaitOutcome> {
        let mut ring = self.ring.lock();
        let outcome = wait_while(&self.not_empty, &mut ring, deadline, cancel, RingStorage::is_empty);
        if outcome != WaitOutcome::Ready {
            activity::record(Strategy::Monitor, op, outcome.into(), ring.len());
            return Err(outcome);
        }
        let Some(value) = ring.try_pop() else {
            unreachable!("ring rejected a pop after reporting an item");
        };
        self.not_full.notify_one();
        activity::record(Strategy::Monitor, op, Outcome::Done, ring.len());
        Ok(value)
    }
}

impl<T: Send> BoundedBuffer<T> for MonitorBuffer<T> {
    fn put_cancellable(&self, value: T, cancel: &CancelToken) -> Result<(), Cancelled<T>> {
        self.enqueue(Operation::Put, value, None, cancel)
            .map_err(|(_, value)| Cancelled(value))
    }

    fn get_cancellable(&self, cancel: &CancelToken) -> Result<T, Cancelled> {
        self.dequeue(Operation::Get, None, cancel)
            .map_err(|_| Cancelled(()))
    }

    fn offer_cancellable(
        &self,
        value: T,
        deadline: Instant,
        cancel: &CancelToken,
    ) -> Result<(), OfferError<T>> {
        self.enqueue(Operation::Offer, value, Some(deadline), cancel)
            .map_err(|(outcome, value)| match outcome {
                WaitOutcome::Cancelled => OfferError::Cancelled(value),
                _ => OfferError::Timeout(value),
            })
    }

    fn poll_cancellable(&self, deadline: Instant, cancel: &CancelToken) -> Result<T, PollError> {
        self.dequeue(Operation::Poll, Some(deadline), cancel)
            .map_err(|outcome| match outcome {
                WaitOutcome::Cancelled => PollError::Cancelled,
                _ => PollError::Timeout,
            })
    }

    fn add(&self, value: T) -> Result<(), T> {
        let mut ring = self.ring.lock();
        match ring.try_push(value) {
            Ok(()) => {
                self.not_empty.notify_one();
                activity::record(Strategy::Monitor, Operation::Add, Outcome::Done, ring.len());
                Ok(())
            }
            Err(value) => {
                activity::record(Strategy::Monitor, Operation::Add, Outcome::Unavailable, ring.len());
                Err(value)
            }
        }
    }

    fn remove(&self) -> Option<T> {
        let mut ring = self.ring.lock();
        let value = ring.try_pop();
        let outcome = if value.is_some() {
            self.not_full.notify_one();
            Outcome::Done
        } else {
            Outcome::Unavailable
        };
        activity::record(Strategy::Monitor, Operation::Remove, outcome, ring.len());
        value
    }

    fn len(&self) -> usize {
        self.ring.lock().len()
    }

    fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    fn strategy(&self) -> Strategy {
        Strategy::Monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn rejects_zero_capacity() {
        assert!(matches!(
            MonitorBuffer::<u8>::new(0),
            Err(BufferError::InvalidCapacity(0))
        ));
    }

    #[test]
    fn blocked_producer_is_woken_by_remove() {
        let buffer = Arc::new(MonitorBuffer::<u32>::new(1).unwrap());
        buffer.put(1u32);

        let producer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || buffer.put(2))
        };
        thread::sleep(Duration::from_millis(30));
        assert_eq!(buffer.remove(), Some(1));
        producer.join().unwrap();
        assert_eq!(buffer.remove(), Some(2));
    }

    #[test]
    fn many_waiters_on_one_slot_all_finish() {
        // More producers than slots: every put beyond the first waits and
        // must be re-checked after each wakeup.
        let buffer = Arc::new(MonitorBuffer::<u32>::new(1).unwrap());
        let producers: Vec<_> = (0..6u32)
            .map(|i| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || buffer.put(i))
            })
            .collect();

        let mut seen: Vec<u32> = (0..6).map(|_| buffer.get()).collect();
        for producer in producers {
            producer.join().unwrap();
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..6).collect::<Vec<_>>());
        assert!(buffer.is_empty());
    }
}
