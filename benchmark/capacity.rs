// capacity.rs - How buffer size affects throughput
use crate::workload::{self, Measurement, Target, Workload};
use pbuf_buffer::{BufferError, Strategy};

pub const CAPACITIES: [usize; 6] = [1, 4, 16, 64, 256, 1024];

pub fn bench_capacities(strategy: Strategy, items_per_producer: u64) -> Result<Vec<Measurement>, BufferError> {
    println!("\n=== Benchmarking Capacities ({}) ===", strategy);

    let mut results = vec![];
    for capacity in CAPACITIES {
        let workload = Workload::new(capacity, 4, items_per_producer);
        results.push(workload::measure(Target::Buffer(strategy), format!("{strategy} cap={capacity}"), &workload)?);
    }
    Ok(results)
}

pub fn print_capacity_results(strategy: Strategy, results: &[Measurement]) {
    workload::print_measurements(&format!("CAPACITY COMPARISON ({})", strategy.as_str().to_uppercase()), results);

    if let (Some(first), Some(last)) = (results.first(), results.last()) {
        println!("  capacity {} -> {}: {:.2}x throughput",
            first.capacity, last.capacity, last.throughput / first.throughput);
    }
}
