// workload.rs - Shared MPMC driver used by every benchmark case
use crossbeam::channel::{self, RecvTimeoutError, SendTimeoutError, TryRecvError, TrySendError};
use crossbeam::utils::Backoff;
use pbuf_buffer::{
    new_buffer, AccessMode, BufferError, CancelToken, OfferError, PollError, SharedBuffer, Strategy,
};
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// What the producers and consumers run against.
#[derive(Debug, Clone, Copy)]
pub enum Target {
    Buffer(Strategy),
    /// `crossbeam::channel::bounded`, as a reference point.
    Channel,
}

impl Target {
    pub fn name(&self) -> &'static str {
        match self {
            Target::Buffer(strategy) => strategy.as_str(),
            Target::Channel => "crossbeam",
        }
    }
}

/// Consumer 0 sleeps once, after taking `after` items.
#[derive(Debug, Clone, Copy)]
pub struct Stall {
    pub after: u64,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct Workload {
    pub capacity: usize,
    /// Producer/consumer pairs.
    pub pairs: usize,
    pub items_per_producer: u64,
    pub producer_mode: AccessMode,
    pub consumer_mode: AccessMode,
    pub timeout: Duration,
    pub stall: Option<Stall>,
}

impl Workload {
    pub fn new(capacity: usize, pairs: usize, items_per_producer: u64) -> Self {
        Workload {
            capacity,
            pairs,
            items_per_producer,
            producer_mode: AccessMode::Blocking,
            consumer_mode: AccessMode::Blocking,
            timeout: Duration::from_millis(10),
            stall: None,
        }
    }

    pub fn modes(mut self, producer: AccessMode, consumer: AccessMode) -> Self {
        self.producer_mode = producer;
        self.consumer_mode = consumer;
        self
    }

    pub fn total(&self) -> u64 {
        self.pairs as u64 * self.items_per_producer
    }
}

pub struct Measurement {
    pub label: String,
    pub pairs: usize,
    pub capacity: usize,
    pub items: u64,
    pub duration: Duration,
    pub throughput: f64,
    /// Failed `add`/`remove` attempts plus timed-out `offer`/`poll` calls.
    pub retries: u64,
    pub offer_timeouts: u64,
    /// Longest time a single item took to get into the queue.
    pub max_enqueue_wait: Duration,
    /// Worst lateness of a timed-out `offer` past its deadline.
    pub max_overshoot: Duration,
}

#[derive(Default)]
struct Counters {
    consumed: AtomicU64,
    retries: AtomicU64,
    offer_timeouts: AtomicU64,
    max_enqueue_wait_ns: AtomicU64,
    max_overshoot_ns: AtomicU64,
}

impl Counters {
    fn retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    fn offer_timed_out(&self, overshoot: Duration) {
        self.retry();
        self.offer_timeouts.fetch_add(1, Ordering::Relaxed);
        self.max_overshoot_ns.fetch_max(overshoot.as_nanos() as u64, Ordering::Relaxed);
    }

    fn enqueued(&self, waited: Duration) {
        self.max_enqueue_wait_ns.fetch_max(waited.as_nanos() as u64, Ordering::Relaxed);
    }

    fn dequeued(&self) -> u64 {
        self.consumed.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Runs `workload` against `target` and measures it.
pub fn measure(target: Target, label: impl Into<String>, workload: &Workload) -> Result<Measurement, BufferError> {
    let counters = Arc::new(Counters::default());
    let start = Instant::now();

    match target {
        Target::Buffer(strategy) => drive_buffer(new_buffer(strategy, workload.capacity)?, workload, &counters),
        Target::Channel => drive_channel(workload, &counters),
    }

    let duration = start.elapsed();
    let items = counters.consumed.load(Ordering::Acquire);
    Ok(Measurement {
        label: label.into(),
        pairs: workload.pairs,
        capacity: workload.capacity,
        items,
        duration,
        throughput: items as f64 / duration.as_secs_f64().max(f64::EPSILON),
        retries: counters.retries.load(Ordering::Relaxed),
        offer_timeouts: counters.offer_timeouts.load(Ordering::Relaxed),
        max_enqueue_wait: Duration::from_nanos(counters.max_enqueue_wait_ns.load(Ordering::Relaxed)),
        max_overshoot: Duration::from_nanos(counters.max_overshoot_ns.load(Ordering::Relaxed)),
    })
}

fn drive_buffer(buffer: SharedBuffer<u64>, workload: &Workload, counters: &Arc<Counters>) {
    let stop = CancelToken::new();
    let total = workload.total();

    let consumers: Vec<_> = (0..workload.pairs)
        .map(|id| {
            let (buffer, workload, counters, stop) =
                (buffer.clone(), workload.clone(), Arc::clone(counters), stop.clone());
            thread::spawn(move || consume_buffer(id, &buffer, &workload, &counters, &stop))
        })
        .collect();

    let producers: Vec<_> = (0..workload.pairs)
        .map(|_| {
            let (buffer, workload, counters) = (buffer.clone(), workload.clone(), Arc::clone(counters));
            thread::spawn(move || produce_buffer(&buffer, &workload, &counters))
        })
        .collect();

    settle(producers, consumers, total, counters, &stop);
}

// Joins the producers, waits until `total` items were taken, then stops the
// consumers. A producer that panicked never delivers its share, so the wait
// is skipped.
fn settle(
    producers: Vec<JoinHandle<()>>,
    consumers: Vec<JoinHandle<()>>,
    total: u64,
    counters: &Counters,
    stop: &CancelToken,
) {
    let mut panicked = 0;
    for handle in producers {
        if handle.join().is_err() {
            panicked += 1;
        }
    }
    if panicked > 0 {
        eprintln!("{} producer(s) panicked, stopping consumers early", panicked);
    } else {
        while counters.consumed.load(Ordering::Acquire) < total {
            if consumers.iter().all(|c| c.is_finished()) {
                eprintln!("All consumers exited with items left in the buffer");
                break;
            }
            thread::sleep(Duration::from_micros(100));
        }
    }
    stop.cancel();
    for handle in consumers {
        if handle.join().is_err() {
            eprintln!("A consumer panicked");
        }
    }
}

fn produce_buffer(buffer: &SharedBuffer<u64>, workload: &Workload, counters: &Counters) {
    let backoff = Backoff::new();

    for value in 0..workload.items_per_producer {
        let started = Instant::now();
        match workload.producer_mode {
            AccessMode::Blocking => buffer.put(value),
            AccessMode::NonBlocking => {
                backoff.reset();
                let mut pending = value;
                while let Err(back) = buffer.add(pending) {
                    counters.retry();
                    pending = back;
                    idle(&backoff);
                }
            }
            AccessMode::Timed => {
                let mut pending = value;
                loop {
                    let attempt = Instant::now();
                    let Some(deadline) = attempt.checked_add(workload.timeout) else {
                        buffer.put(pending);
                        break;
                    };
                    match buffer.offer(pending, deadline) {
                        Ok(()) => break,
                        Err(OfferError::Timeout(back)) => {
                            counters.offer_timed_out(attempt.elapsed().saturating_sub(workload.timeout));
                            pending = back;
                        }
                        Err(OfferError::Cancelled(_)) => return,
                    }
                }
            }
        }
        counters.enqueued(started.elapsed());
    }
}

fn consume_buffer(id: usize, buffer: &SharedBuffer<u64>, workload: &Workload, counters: &Counters, stop: &CancelToken) {
    let backoff = Backoff::new();

    loop {
        match workload.consumer_mode {
            AccessMode::Blocking => {
                if buffer.get_cancellable(stop).is_err() {
                    return;
                }
            }
            AccessMode::NonBlocking => {
                if buffer.remove().is_none() {
                    if stop.is_cancelled() {
                        return;
                    }
                    counters.retry();
                    idle(&backoff);
                    continue;
                }
                backoff.reset();
            }
            AccessMode::Timed => match Instant::now().checked_add(workload.timeout) {
                Some(deadline) => match buffer.poll_cancellable(deadline, stop) {
                    Ok(_) => {}
                    Err(PollError::Timeout) => {
                        counters.retry();
                        continue;
                    }
                    Err(PollError::Cancelled) => return,
                },
                None => {
                    if buffer.get_cancellable(stop).is_err() {
                        return;
                    }
                }
            },
        }
        let taken = counters.dequeued();
        maybe_stall(id, taken, workload);
    }
}

// Senders are dropped as producers finish, so consumers stop on disconnect.
fn drive_channel(workload: &Workload, counters: &Arc<Counters>) {
    let (tx, rx) = channel::bounded::<u64>(workload.capacity);

    let consumers: Vec<_> = (0..workload.pairs)
        .map(|id| {
            let (rx, workload, counters) = (rx.clone(), workload.clone(), Arc::clone(counters));
            thread::spawn(move || consume_channel(id, &rx, &workload, &counters))
        })
        .collect();
    drop(rx);

    let producers: Vec<_> = (0..workload.pairs)
        .map(|_| {
            let (tx, workload, counters) = (tx.clone(), workload.clone(), Arc::clone(counters));
            thread::spawn(move || produce_channel(&tx, &workload, &counters))
        })
        .collect();
    drop(tx);

    for handle in producers.into_iter().chain(consumers) {
        let _ = handle.join();
    }
}

fn produce_channel(tx: &channel::Sender<u64>, workload: &Workload, counters: &Counters) {
    let backoff = Backoff::new();

    for value in 0..workload.items_per_producer {
        let started = Instant::now();
        match workload.producer_mode {
            AccessMode::Blocking => {
                if tx.send(value).is_err() {
                    return;
                }
            }
            AccessMode::NonBlocking => {
                backoff.reset();
                let mut pending = value;
                loop {
                    match tx.try_send(pending) {
                        Ok(()) => break,
                        Err(TrySendError::Full(back)) => {
                            counters.retry();
                            pending = back;
                            idle(&backoff);
                        }
                        Err(TrySendError::Disconnected(_)) => return,
                    }
                }
            }
            AccessMode::Timed => {
                let mut pending = value;
                loop {
                    let attempt = Instant::now();
                    match tx.send_timeout(pending, workload.timeout) {
                        Ok(()) => break,
                        Err(SendTimeoutError::Timeout(back)) => {
                            counters.offer_timed_out(attempt.elapsed().saturating_sub(workload.timeout));
                            pending = back;
                        }
                        Err(SendTimeoutError::Disconnected(_)) => return,
                    }
                }
            }
        }
        counters.enqueued(started.elapsed());
    }
}

fn consume_channel(id: usize, rx: &channel::Receiver<u64>, workload: &Workload, counters: &Counters) {
    let backoff = Backoff::new();

    loop {
        match workload.consumer_mode {
            AccessMode::Blocking => {
                if rx.recv().is_err() {
                    return;
                }
            }
            AccessMode::NonBlocking => match rx.try_recv() {
                Ok(_) => backoff.reset(),
                Err(TryRecvError::Empty) => {
                    counters.retry();
                    idle(&backoff);
                    continue;
                }
                Err(TryRecvError::Disconnected) => return,
            },
            AccessMode::Timed => match rx.recv_timeout(workload.timeout) {
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => {
                    counters.retry();
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => return,
            },
        }
        let taken = counters.dequeued();
        maybe_stall(id, taken, workload);
    }
}

fn maybe_stall(consumer: usize, taken: u64, workload: &Workload) {
    if let Some(stall) = workload.stall {
        if consumer == 0 && taken == stall.after {
            println!("  Consumer 0 STALLED for {:?} after {} items", stall.duration, taken);
            thread::sleep(stall.duration);
            println!("  Consumer 0 RESUMED");
        }
    }
}

fn idle(backoff: &Backoff) {
    if backoff.is_completed() {
        thread::sleep(Duration::from_micros(50));
    } else {
        backoff.snooze();
    }
}

pub fn print_measurements(title: &str, results: &[Measurement]) {
    println!("\n╔═══════════════════════════════════════════════════════════════════════════════╗");
    println!("║ {:<77} ║", title);
    println!("╠═══════════════════════════════════════════════════════════════════════════════╣");
    println!("║ Case                 │ Pairs │  Cap │ Duration │    Items │   Throughput │ Retries ║");
    println!("╠═══════════════════════════════════════════════════════════════════════════════╣");

    for result in results {
        println!("║ {:<20} │ {:>5} │ {:>4} │ {:>7.3}s │ {:>8} │ {:>10.0}/s │ {:>7} ║",
            result.label,
            result.pairs,
            result.capacity,
            result.duration.as_secs_f64(),
            result.items,
            result.throughput,
            result.retries
        );
    }

    println!("╚═══════════════════════════════════════════════════════════════════════════════╝");

    if let Some(best) = results.iter().max_by(|a, b| a.throughput.total_cmp(&b.throughput)) {
        println!("\nHighest throughput: {} ({:.0} items/s)", best.label, best.throughput);
    }
}
