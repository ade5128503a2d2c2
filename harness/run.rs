// One harness run: spawn, collect, stop, verify.
use std::collections::HashMap;
use std::fmt;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use pbuf_buffer::{new_buffer, BufferError, CancelToken, SharedBuffer, Strategy};

use crate::config::{ConfigError, HarnessConfig};
use crate::roles::{Consumer, ConsumerStats, Item, Producer, ProducerStats};

// How often the collector wakes up to check on the worker threads.
const COLLECT_TICK: Duration = Duration::from_millis(20);

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error("failed to spawn {role}-{id}: {source}")]
    Spawn {
        role: &'static str,
        id: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("{role}-{id} panicked")]
    WorkerPanicked { role: &'static str, id: usize },
    #[error("{role}-{id} stopped before the run was over")]
    WorkerExited { role: &'static str, id: usize },
    #[error("verification failed: {0}")]
    Verification(String),
}

/// Outcome of a verified run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub strategy: Strategy,
    pub capacity: usize,
    pub producers: Vec<ProducerStats>,
    pub consumers: Vec<ConsumerStats>,
    pub duration: Duration,
}

impl RunReport {
    pub fn produced(&self) -> u64 {
        self.producers.iter().map(|p| p.produced).sum()
    }

    pub fn consumed(&self) -> u64 {
        self.consumers.iter().map(|c| c.consumed).sum()
    }

    pub fn add_rejections(&self) -> u64 {
        self.producers.iter().map(|p| p.add_rejections).sum()
    }

    pub fn offer_timeouts(&self) -> u64 {
        self.producers.iter().map(|p| p.offer_timeouts).sum()
    }

    pub fn remove_misses(&self) -> u64 {
        self.consumers.iter().map(|c| c.remove_misses).sum()
    }

    pub fn poll_timeouts(&self) -> u64 {
        self.consumers.iter().map(|c| c.poll_timeouts).sum()
    }

    /// Items per second through the buffer.
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.consumed() as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Run summary (strategy={}, capacity={}):",
            self.strategy, self.capacity
        )?;
        for (i, p) in self.producers.iter().enumerate() {
            writeln!(
                f,
                "  producer-{}: produced={}, add_rejections={}, offer_timeouts={}",
                i, p.produced, p.add_rejections, p.offer_timeouts
            )?;
        }
        for (i, c) in self.consumers.iter().enumerate() {
            writeln!(
                f,
                "  consumer-{}: consumed={}, remove_misses={}, poll_timeouts={}",
                i, c.consumed, c.remove_misses, c.poll_timeouts
            )?;
        }
        write!(
            f,
            "  total: {} items in {:.2?} ({:.0} items/s)",
            self.consumed(),
            self.duration,
            self.throughput()
        )
    }
}

/// Validates `config`, runs every producer and consumer to completion and
/// checks that what came out is exactly what went in.
pub fn run(config: &HarnessConfig) -> Result<RunReport, HarnessError> {
    config.validate()?;
    let buffer = new_buffer::<Item>(config.strategy, config.capacity)?;
    tracing::info!(
        strategy = %config.strategy,
        capacity = config.capacity,
        producers = config.producers,
        consumers = config.consumers,
        items_per_producer = config.items_per_producer,
        producer_mode = %config.producer_mode,
        consumer_mode = %config.consumer_mode,
        "starting run"
    );

    let stop = CancelToken::new();
    let (sink, collected) = unbounded();
    let start = Instant::now();

    let mut workers = Workers::default();
    if let Err(e) = workers.spawn(config, &buffer, &stop, &sink) {
        stop.cancel();
        workers.abandon();
        return Err(e);
    }

    let received = match workers.collect(&collected, &stop) {
        Ok(received) => received,
        Err(e) => {
            stop.cancel();
            workers.abandon();
            return Err(e);
        }
    };

    stop.cancel();
    drop(sink);
    let producers = workers.producer_stats.clone();
    let consumers = workers.join_consumers()?;
    let duration = start.elapsed();

    verify(&producers, &received)?;
    if consumers.iter().map(|c| c.consumed).sum::<u64>() != received.len() as u64 {
        return Err(HarnessError::Verification(
            "consumer counters disagree with collected items".into(),
        ));
    }

    let report = RunReport {
        strategy: config.strategy,
        capacity: config.capacity,
        producers,
        consumers,
        duration,
    };
    tracing::info!(
        items = report.consumed(),
        elapsed_ms = duration.as_millis() as u64,
        "run verified"
    );
    Ok(report)
}

#[derive(Default)]
struct Workers {
    producers: Vec<JoinHandle<ProducerStats>>,
    consumers: Vec<JoinHandle<ConsumerStats>>,
    producer_stats: Vec<ProducerStats>,
}

impl Workers {
    fn spawn(
        &mut self,
        config: &HarnessConfig,
        buffer: &SharedBuffer<Item>,
        stop: &CancelToken,
        sink: &Sender<(usize, Item)>,
    ) -> Result<(), HarnessError> {
        for id in 0..config.consumers {
            let consumer = Consumer {
                id,
                buffer: buffer.clone(),
                mode: config.consumer_mode,
                timeout: config.timeout,
                pause: config.consumer_pause,
                stop: stop.clone(),
                sink: sink.clone(),
            };
            let handle = thread::Builder::new()
                .name(format!("consumer-{id}"))
                .spawn(move || consumer.run())
                .map_err(|source| HarnessError::Spawn {
                    role: "consumer",
                    id,
                    source,
                })?;
            self.consumers.push(handle);
        }

        for id in 0..config.producers {
            let producer = Producer {
                id,
                buffer: buffer.clone(),
                mode: config.producer_mode,
                items: config.items_per_producer,
                timeout: config.timeout,
                pause: config.producer_pause,
                stop: stop.clone(),
            };
            let handle = thread::Builder::new()
                .name(format!("producer-{id}"))
                .spawn(move || producer.run())
                .map_err(|source| HarnessError::Spawn {
                    role: "producer",
                    id,
                    source,
                })?;
            self.producers.push(handle);
        }
        Ok(())
    }

    // Collects items until every producer has finished and everything they
    // produced has come out the other side. Producers are joined here.
    fn collect(
        &mut self,
        collected: &Receiver<(usize, Item)>,
        stop: &CancelToken,
    ) -> Result<Vec<(usize, Item)>, HarnessError> {
        let mut received = Vec::new();
        let mut expected: Option<u64> = None;

        loop {
            if expected.is_none() && self.producers.iter().all(JoinHandle::is_finished) {
                let stats = self.join_producers()?;
                let total = stats.iter().map(|p| p.produced).sum();
                tracing::debug!(total, "all producers finished");
                self.producer_stats = stats;
                expected = Some(total);
            }
            if let Some(total) = expected {
                if received.len() as u64 >= total {
                    return Ok(received);
                }
            }
            if !stop.is_cancelled() {
                if let Some(id) = self.consumers.iter().position(JoinHandle::is_finished) {
                    let handle = self.consumers.remove(id);
                    return Err(match handle.join() {
                        Ok(_) => HarnessError::WorkerExited { role: "consumer", id },
                        Err(_) => {
                            tracing::error!(role = "consumer", id, "worker panicked");
                            HarnessError::WorkerPanicked { role: "consumer", id }
                        }
                    });
                }
            }

            match collected.recv_timeout(COLLECT_TICK) {
                Ok(entry) => received.push(entry),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(HarnessError::Verification(format!(
                        "collector disconnected after {} items",
                        received.len()
                    )));
                }
            }
        }
    }

    fn join_producers(&mut self) -> Result<Vec<ProducerStats>, HarnessError> {
        join_all("producer", self.producers.drain(..))
    }

    fn join_consumers(&mut self) -> Result<Vec<ConsumerStats>, HarnessError> {
        join_all("consumer", self.consumers.drain(..))
    }

    // Joins whatever is still running after the stop token fired.
    fn abandon(&mut self) {
        if let Err(e) = self.join_producers() {
            tracing::error!(error = %e, "producer failed during shutdown");
        }
        if let Err(e) = self.join_consumers() {
            tracing::error!(error = %e, "consumer failed during shutdown");
        }
    }
}

fn join_all<S>(
    role: &'static str,
    handles: impl Iterator<Item = JoinHandle<S>>,
) -> Result<Vec<S>, HarnessError> {
    let mut stats = Vec::new();
    let mut panicked = None;
    for (id, handle) in handles.enumerate() {
        match handle.join() {
            Ok(s) => stats.push(s),
            Err(_) => {
                tracing::error!(role, id, "worker panicked");
                panicked = panicked.or(Some(id));
            }
        }
    }
    match panicked {
        Some(id) => Err(HarnessError::WorkerPanicked { role, id }),
        None => Ok(stats),
    }
}

/// Checks that `received` holds each produced item exactly once, and that
/// each consumer saw any single producer's items in increasing order.
pub fn verify(producers: &[ProducerStats], received: &[(usize, Item)]) -> Result<(), HarnessError> {
    let expected: u64 = producers.iter().map(|p| p.produced).sum();
    if received.len() as u64 != expected {
        return Err(HarnessError::Verification(format!(
            "produced {expected} items but consumed {}",
            received.len()
        )));
    }

    let mut seen = vec![Vec::<bool>::new(); producers.len()];
    for (p, stats) in producers.iter().enumerate() {
        seen[p] = vec![false; stats.produced as usize];
    }
    let mut last_seq: HashMap<(usize, usize), u64> = HashMap::new();

    for &(consumer, item) in received {
        let Some(slot) = seen
            .get_mut(item.producer)
            .and_then(|s| s.get_mut(item.seq as usize))
        else {
            return Err(HarnessError::Verification(format!(
                "consumer-{consumer} got unknown item {item:?}"
            )));
        };
        if std::mem::replace(slot, true) {
            return Err(HarnessError::Verification(format!("{item:?} consumed twice")));
        }
        if let Some(prev) = last_seq.insert((consumer, item.producer), item.seq) {
            if prev >= item.seq {
                return Err(HarnessError::Verification(format!(
                    "consumer-{consumer} got producer-{} seq {} after seq {prev}",
                    item.producer, item.seq
                )));
            }
        }
    }
    Ok(())
}
