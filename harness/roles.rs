// Producer and consumer work loops, one per AccessMode.
//
// Every role shares the run's stop token. Producers only see it fire when a
// run is aborted; consumers see it fire once every produced item has been
// collected.
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::Sender;
use crossbeam::utils::Backoff;
use pbuf_buffer::{AccessMode, CancelToken, OfferError, PollError, SharedBuffer};

// Sleep once the spin/yield backoff is exhausted in non-blocking mode.
const IDLE_SLEEP: Duration = Duration::from_micros(100);

/// A value moved through the buffer: who made it and in which order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub producer: usize,
    pub seq: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProducerStats {
    pub produced: u64,
    pub add_rejections: u64,
    pub offer_timeouts: u64,
    /// The stop token fired before all items were enqueued.
    pub aborted: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerStats {
    pub consumed: u64,
    pub remove_misses: u64,
    pub poll_timeouts: u64,
}

pub struct Producer {
    pub id: usize,
    pub buffer: SharedBuffer<Item>,
    pub mode: AccessMode,
    pub items: u64,
    pub timeout: Duration,
    pub pause: Duration,
    pub stop: CancelToken,
}

impl Producer {
    pub fn run(self) -> ProducerStats {
        let mut stats = ProducerStats::default();
        let backoff = Backoff::new();

        for seq in 0..self.items {
            let item = Item {
                producer: self.id,
                seq,
            };
            let stored = match self.mode {
                AccessMode::Blocking => self.buffer.put_cancellable(item, &self.stop).is_ok(),
                AccessMode::NonBlocking => self.add_until_stored(item, &backoff, &mut stats),
                AccessMode::Timed => self.offer_until_stored(item, &mut stats),
            };
            if !stored {
                tracing::debug!(producer = self.id, seq, op = %self.mode.enqueue_op(), "producer stopped early");
                stats.aborted = true;
                return stats;
            }
            stats.produced += 1;
            tracing::trace!(producer = self.id, seq, op = %self.mode.enqueue_op(), "produced");
            pause(self.pause);
        }
        stats
    }

    fn add_until_stored(&self, mut item: Item, backoff: &Backoff, stats: &mut ProducerStats) -> bool {
        backoff.reset();
        loop {
            match self.buffer.add(item) {
                Ok(()) => return true,
                Err(back) => {
                    if self.stop.is_cancelled() {
                        return false;
                    }
                    stats.add_rejections += 1;
                    item = back;
                    idle(backoff);
                }
            }
        }
    }

    fn offer_until_stored(&self, mut item: Item, stats: &mut ProducerStats) -> bool {
        loop {
            let Some(deadline) = Instant::now().checked_add(self.timeout) else {
                return self.buffer.put_cancellable(item, &self.stop).is_ok();
            };
            match self.buffer.offer_cancellable(item, deadline, &self.stop) {
                Ok(()) => return true,
                Err(OfferError::Timeout(back)) => {
                    stats.offer_timeouts += 1;
                    item = back;
                }
                Err(OfferError::Cancelled(_)) => return false,
            }
        }
    }
}

pub struct Consumer {
    pub id: usize,
    pub buffer: SharedBuffer<Item>,
    pub mode: AccessMode,
    pub timeout: Duration,
    pub pause: Duration,
    pub stop: CancelToken,
    /// Receives `(consumer id, item)` for every value taken.
    pub sink: Sender<(usize, Item)>,
}

impl Consumer {
    /// Runs until the stop token fires or the collector hangs up.
    pub fn run(self) -> ConsumerStats {
        let mut stats = ConsumerStats::default();
        let backoff = Backoff::new();

        loop {
            let item = match self.mode {
                AccessMode::Blocking => match self.buffer.get_cancellable(&self.stop) {
                    Ok(item) => item,
                    Err(_) => break,
                },
                AccessMode::NonBlocking => match self.buffer.remove() {
                    Some(item) => {
                        backoff.reset();
                        item
                    }
                    None => {
                        if self.stop.is_cancelled() {
                            break;
                        }
                        stats.remove_misses += 1;
                        idle(&backoff);
                        continue;
                    }
                },
                AccessMode::Timed => match Instant::now().checked_add(self.timeout) {
                    Some(deadline) => match self.buffer.poll_cancellable(deadline, &self.stop) {
                        Ok(item) => item,
                        Err(PollError::Timeout) => {
                            stats.poll_timeouts += 1;
                            continue;
                        }
                        Err(PollError::Cancelled) => break,
                    },
                    None => match self.buffer.get_cancellable(&self.stop) {
                        Ok(item) => item,
                        Err(_) => break,
                    },
                },
            };

            stats.consumed += 1;
            tracing::trace!(
                consumer = self.id,
                producer = item.producer,
                seq = item.seq,
                op = %self.mode.dequeue_op(),
                "consumed"
            );
            if self.sink.send((self.id, item)).is_err() {
                tracing::debug!(consumer = self.id, "collector gone");
                break;
            }
            pause(self.pause);
        }
        stats
    }
}

fn idle(backoff: &Backoff) {
    if backoff.is_completed() {
        thread::sleep(IDLE_SLEEP);
    } else {
        backoff.snooze();
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
