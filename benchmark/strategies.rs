// strategies.rs - Monitor vs semaphore, with a crossbeam channel as reference
use crate::workload::{self, Measurement, Target, Workload};
use pbuf_buffer::{BufferError, Strategy};
use std::thread;
use std::time::Duration;

pub const TARGETS: [Target; 3] = [
    Target::Buffer(Strategy::Monitor),
    Target::Buffer(Strategy::Semaphore),
    Target::Channel,
];

/// Same MPMC load against every target.
pub fn bench_strategies(capacity: usize, pairs: usize, items_per_producer: u64) -> Result<Vec<Measurement>, BufferError> {
    println!("\n=== Benchmarking Strategies ({} pairs, capacity {}) ===", pairs, capacity);

    let workload = Workload::new(capacity, pairs, items_per_producer);
    let mut results = vec![];

    for target in TARGETS {
        println!("Running {}...", target.name());
        results.push(workload::measure(target, target.name(), &workload)?);
        thread::sleep(Duration::from_millis(200));
    }

    Ok(results)
}

pub fn print_strategy_results(results: &[Measurement]) {
    workload::print_measurements("STRATEGY COMPARISON", results);

    let reference = results.iter().find(|r| r.label == Target::Channel.name());
    if let Some(reference) = reference {
        println!("\n=== Relative to crossbeam::channel::bounded ===");
        for result in results.iter().filter(|r| r.label != reference.label) {
            println!("  {:<10} {:>6.2}x", result.label, result.throughput / reference.throughput);
        }
    }
}
