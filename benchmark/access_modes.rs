// access_modes.rs - Blocking, non-blocking and timed operation families
use crate::workload::{self, Measurement, Target, Workload};
use pbuf_buffer::{AccessMode, BufferError, Strategy};
use std::time::Duration;

/// Both strategies with producers and consumers in `mode`.
pub fn bench_mode(mode: AccessMode, items_per_producer: u64) -> Result<Vec<Measurement>, BufferError> {
    println!("\n=== Benchmarking {} Mode ===", mode);

    let mut workload = Workload::new(16, 4, items_per_producer).modes(mode, mode);
    workload.timeout = Duration::from_millis(5);

    Strategy::ALL
        .into_iter()
        .map(|strategy| workload::measure(Target::Buffer(strategy), format!("{strategy}/{mode}"), &workload))
        .collect()
}

/// Every mode for both strategies.
pub fn bench_all_modes(items_per_producer: u64) -> Result<Vec<Measurement>, BufferError> {
    let mut results = vec![];
    for mode in AccessMode::ALL {
        results.extend(bench_mode(mode, items_per_producer)?);
    }
    Ok(results)
}

pub fn print_mode_results(results: &[Measurement]) {
    workload::print_measurements("ACCESS MODE COMPARISON", results);

    let timeouts: u64 = results.iter().map(|r| r.offer_timeouts).sum();
    if timeouts > 0 {
        let worst = results.iter().map(|r| r.max_overshoot).max().unwrap_or_default();
        println!("  {} offer timeouts, worst deadline overshoot {:?}", timeouts, worst);
    }
}
