// concurrency.rs - Single pair baseline and producer/consumer scalability
use crate::workload::{self, Measurement, Target, Workload};
use pbuf_buffer::{BufferError, Strategy};
use std::thread;
use std::time::Duration;

pub const PAIR_COUNTS: [usize; 4] = [1, 2, 4, 8];

/// One producer, one consumer, per strategy.
pub fn bench_single_pair(items: u64) -> Result<Vec<Measurement>, BufferError> {
    println!("\n=== Benchmarking Single Producer/Consumer Pair ===");

    let workload = Workload::new(16, 1, items);
    Strategy::ALL
        .into_iter()
        .map(|strategy| workload::measure(Target::Buffer(strategy), format!("{strategy} 1x1"), &workload))
        .collect()
}

/// Scales pairs over [`PAIR_COUNTS`] with a fixed total item count.
pub fn bench_scalability(strategy: Strategy, total_items: u64) -> Result<Vec<Measurement>, BufferError> {
    println!("\n=== Benchmarking Thread Scalability ({}) ===", strategy);

    let mut results = vec![];
    for pairs in PAIR_COUNTS {
        let workload = Workload::new(16, pairs, total_items / pairs as u64);
        results.push(workload::measure(Target::Buffer(strategy), format!("{strategy} {pairs}x{pairs}"), &workload)?);

        // Small delay between tests
        thread::sleep(Duration::from_millis(200));
    }
    Ok(results)
}

pub fn print_concurrency_results(results: &[Measurement]) {
    workload::print_measurements("CONCURRENCY BENCHMARK RESULTS", results);

    // Contention cost relative to the first row
    if results.len() > 1 {
        println!("\n=== Scalability Analysis ===");
        if let Some(baseline) = results.first() {
            for result in results.iter().skip(1) {
                let speedup = result.throughput / baseline.throughput;
                println!("  {} pairs: {:.2}x throughput vs {} pair(s)",
                    result.pairs, speedup, baseline.pairs);
            }
        }
    }
}
