// stall.rs - A consumer stops mid-run; producers must resume once it comes back.
// Blocked `put` callers stay parked for the whole stall, `offer` callers give up
// at their deadline and retry.
use crate::workload::{self, Measurement, Stall, Target, Workload};
use pbuf_buffer::{AccessMode, BufferError, Strategy};
use std::time::Duration;

const STALL: Duration = Duration::from_millis(500);
const OFFER_TIMEOUT: Duration = Duration::from_millis(20);

pub struct StallResult {
    pub measurement: Measurement,
    pub stall: Duration,
    pub completed: bool,
}

fn run_stalled(strategy: Strategy, producer_mode: AccessMode, items_per_producer: u64) -> Result<StallResult, BufferError> {
    let mut workload = Workload::new(4, 1, items_per_producer).modes(producer_mode, AccessMode::Blocking);
    workload.timeout = OFFER_TIMEOUT;
    workload.stall = Some(Stall { after: items_per_producer / 2, duration: STALL });

    let label = format!("{strategy}/{producer_mode}");
    let measurement = workload::measure(Target::Buffer(strategy), label, &workload)?;
    let completed = measurement.items == workload.total();

    Ok(StallResult { measurement, stall: STALL, completed })
}

/// Producers blocked in `put` behind a stalled consumer.
pub fn bench_stalled_put(items_per_producer: u64) -> Result<Vec<StallResult>, BufferError> {
    println!("\n=== Benchmarking Blocked put() Behind a Stalled Consumer ===");
    Strategy::ALL
        .into_iter()
        .map(|strategy| run_stalled(strategy, AccessMode::Blocking, items_per_producer))
        .collect()
}

/// Producers using `offer` with a deadline behind a stalled consumer.
pub fn bench_stalled_offer(items_per_producer: u64) -> Result<Vec<StallResult>, BufferError> {
    println!("\n=== Benchmarking offer() Deadlines Behind a Stalled Consumer ===");
    Strategy::ALL
        .into_iter()
        .map(|strategy| run_stalled(strategy, AccessMode::Timed, items_per_producer))
        .collect()
}

pub fn print_stall_results(results: &[StallResult]) {
    println!("\n╔═══════════════════════════════════════════════════════════════════════════════╗");
    println!("║                       STALLED CONSUMER RESULTS                                ║");
    println!("╠═══════════════════════════════════════════════════════════════════════════════╣");
    println!("║ Case                 │  Stall │ Max enqueue wait │ Timeouts │ Overshoot │ Done ║");
    println!("╠═══════════════════════════════════════════════════════════════════════════════╣");

    for result in results {
        let m = &result.measurement;
        println!("║ {:<20} │ {:>4}ms │ {:>13.1}ms │ {:>8} │ {:>7.2}ms │ {:>4} ║",
            m.label,
            result.stall.as_millis(),
            m.max_enqueue_wait.as_secs_f64() * 1000.0,
            m.offer_timeouts,
            m.max_overshoot.as_secs_f64() * 1000.0,
            if result.completed { "yes" } else { "NO" }
        );
    }

    println!("╚═══════════════════════════════════════════════════════════════════════════════╝");

    if results.iter().all(|r| r.completed) {
        println!("✓ Every producer resumed once the consumer came back");
    }
}
