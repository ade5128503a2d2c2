// pbuf-bench: Protected Bounded Buffer Benchmark Suite
// Compares monitor and semaphore strategies across access modes, capacities,
// thread counts and stalled consumers
mod access_modes;
mod capacity;
mod concurrency;
mod cpu_monitor;
mod stall;
mod strategies;
mod workload;

use clap::{Parser, Subcommand};
use pbuf_buffer::{AccessMode, BufferError, Strategy};
use std::process;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pbuf-bench")]
#[command(about = "Protected Bounded Buffer Benchmark Suite", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run all benchmark cases
    #[arg(short, long)]
    all: bool,

    /// Run specific case (shorthand for 'case' subcommand)
    #[arg(short = 'c', long = "case", value_name = "NAME")]
    case: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run specific benchmark case
    Case {
        /// Case name to run
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// List all available benchmark cases
    List,
}

fn print_banner() {
    println!("╔═══════════════════════════════════════════════════════════════════════════╗");
    println!("║                                                                           ║");
    println!("║               PROTECTED BOUNDED BUFFER BENCHMARK SUITE                    ║");
    println!("║                                                                           ║");
    println!("║  Testing: Monitor vs Semaphore, Access Modes, Capacity, Stalled Consumers ║");
    println!("║                                                                           ║");
    println!("╚═══════════════════════════════════════════════════════════════════════════╝");
}

fn list_cases() {
    println!("\n=== Available Benchmark Cases ===\n");

    println!("STRATEGIES:");
    println!("  strategy-compare    - Monitor vs semaphore vs crossbeam bounded channel");
    println!();

    println!("ACCESS MODES:");
    println!("  mode-blocking       - put/get on both strategies");
    println!("  mode-non-blocking   - add/remove with backoff on both strategies");
    println!("  mode-timed          - offer/poll with deadlines on both strategies");
    println!("  mode-all            - Compare all access modes");
    println!();

    println!("CAPACITY:");
    println!("  capacity-monitor    - Capacities 1..1024, monitor strategy");
    println!("  capacity-semaphore  - Capacities 1..1024, semaphore strategy");
    println!("  capacity-all        - Both strategies");
    println!();

    println!("CONCURRENCY:");
    println!("  concurrency-single  - Single producer/consumer pair baseline");
    println!("  concurrency-scale   - Scalability (1,2,4,8 pairs) per strategy");
    println!("  concurrency-all     - Run all concurrency tests");
    println!();

    println!("STALLED CONSUMER (Liveness):");
    println!("  stall-put           - Producers blocked in put() resume after a stall");
    println!("  stall-offer         - offer() deadlines honoured during a stall");
    println!("  stall-all           - Run all stall tests");
    println!();

    println!("CPU:");
    println!("  cpu                 - Strategy comparison with CPU sampling");
    println!();

    println!("COMPREHENSIVE:");
    println!("  quick               - Quick benchmark suite (~10 seconds)");
    println!("  full                - Full benchmark suite (~2 minutes)");
    println!();

    println!("Usage:");
    println!("  pbuf-bench -a                       # Run all benchmarks");
    println!("  pbuf-bench -c mode-all              # Run all access mode tests");
    println!("  pbuf-bench case concurrency-scale   # Run scalability test");
    println!("  pbuf-bench list                     # Show this list");
}

fn run_strategy_compare() -> Result<(), BufferError> {
    let results = strategies::bench_strategies(64, 4, 50_000)?;
    strategies::print_strategy_results(&results);
    Ok(())
}

fn run_mode(mode: AccessMode) -> Result<(), BufferError> {
    let results = access_modes::bench_mode(mode, 20_000)?;
    access_modes::print_mode_results(&results);
    Ok(())
}

fn run_mode_all() -> Result<(), BufferError> {
    println!("\n=== COMPREHENSIVE ACCESS MODE COMPARISON ===");
    let results = access_modes::bench_all_modes(20_000)?;
    access_modes::print_mode_results(&results);
    Ok(())
}

fn run_capacity(strategy: Strategy) -> Result<(), BufferError> {
    let results = capacity::bench_capacities(strategy, 20_000)?;
    capacity::print_capacity_results(strategy, &results);
    Ok(())
}

fn run_capacity_all() -> Result<(), BufferError> {
    for strategy in Strategy::ALL {
        run_capacity(strategy)?;
    }
    Ok(())
}

fn run_concurrency_single() -> Result<(), BufferError> {
    let results = concurrency::bench_single_pair(100_000)?;
    concurrency::print_concurrency_results(&results);
    Ok(())
}

fn run_concurrency_scale() -> Result<(), BufferError> {
    for strategy in Strategy::ALL {
        let results = concurrency::bench_scalability(strategy, 160_000)?;
        concurrency::print_concurrency_results(&results);
    }
    Ok(())
}

fn run_concurrency_all() -> Result<(), BufferError> {
    println!("\n=== COMPREHENSIVE CONCURRENCY TESTS ===\n");
    run_concurrency_single()?;
    run_concurrency_scale()
}

fn run_stall_put() -> Result<(), BufferError> {
    let results = stall::bench_stalled_put(200)?;
    stall::print_stall_results(&results);
    Ok(())
}

fn run_stall_offer() -> Result<(), BufferError> {
    let results = stall::bench_stalled_offer(200)?;
    stall::print_stall_results(&results);
    Ok(())
}

fn run_stall_all() -> Result<(), BufferError> {
    println!("\n=== COMPREHENSIVE STALLED CONSUMER TESTS ===");

    let mut all_results = stall::bench_stalled_put(200)?;
    thread::sleep(Duration::from_millis(200));
    all_results.extend(stall::bench_stalled_offer(200)?);

    stall::print_stall_results(&all_results);
    Ok(())
}

fn run_cpu() -> Result<(), BufferError> {
    let load = workload::Workload::new(64, 4, 50_000);
    let mut rows = vec![];

    for target in strategies::TARGETS {
        let (result, stats) = cpu_monitor::run_with_cpu_monitor(target.name(), || {
            workload::measure(target, target.name(), &load)
        });
        rows.push((target.name().to_string(), result?.throughput, stats));
        thread::sleep(Duration::from_millis(200));
    }

    cpu_monitor::print_cpu_results(&rows);
    Ok(())
}

fn run_quick_suite() -> Result<(), BufferError> {
    println!("\n╔═══════════════════════════════════════════════════════════════════════════╗");
    println!("║                         QUICK BENCHMARK SUITE                             ║");
    println!("║                          (Estimated: 10 seconds)                          ║");
    println!("╚═══════════════════════════════════════════════════════════════════════════╝");

    let results = strategies::bench_strategies(16, 2, 10_000)?;
    strategies::print_strategy_results(&results);

    let results = access_modes::bench_mode(AccessMode::NonBlocking, 5_000)?;
    access_modes::print_mode_results(&results);

    println!("\n✓ Quick benchmark suite completed!");
    Ok(())
}

fn run_full_suite() -> Result<(), BufferError> {
    println!("\n╔═══════════════════════════════════════════════════════════════════════════╗");
    println!("║                         FULL BENCHMARK SUITE                              ║");
    println!("║                          (Estimated: 2 minutes)                           ║");
    println!("╚═══════════════════════════════════════════════════════════════════════════╝");

    run_strategy_compare()?;
    println!("\n{}", "─".repeat(79));

    run_mode_all()?;
    println!("\n{}", "─".repeat(79));

    run_capacity_all()?;
    println!("\n{}", "─".repeat(79));

    run_concurrency_all()?;
    println!("\n{}", "─".repeat(79));

    run_stall_all()?;
    println!("\n{}", "─".repeat(79));

    run_cpu()?;

    println!("\n✓ Full benchmark suite completed!");
    Ok(())
}

fn run_case(name: &str) -> Result<(), BufferError> {
    match name {
        "strategy-compare" => run_strategy_compare(),

        // Access modes
        "mode-blocking" => run_mode(AccessMode::Blocking),
        "mode-non-blocking" => run_mode(AccessMode::NonBlocking),
        "mode-timed" => run_mode(AccessMode::Timed),
        "mode-all" => run_mode_all(),

        // Capacity
        "capacity-monitor" => run_capacity(Strategy::Monitor),
        "capacity-semaphore" => run_capacity(Strategy::Semaphore),
        "capacity-all" => run_capacity_all(),

        // Concurrency
        "concurrency-single" => run_concurrency_single(),
        "concurrency-scale" => run_concurrency_scale(),
        "concurrency-all" => run_concurrency_all(),

        // Stalled consumer (liveness)
        "stall-put" => run_stall_put(),
        "stall-offer" => run_stall_offer(),
        "stall-all" => run_stall_all(),

        "cpu" => run_cpu(),

        // Suites
        "quick" => run_quick_suite(),
        "full" => run_full_suite(),

        _ => {
            eprintln!("Error: Unknown benchmark case '{}'", name);
            eprintln!("Run 'pbuf-bench list' to see available cases");
            process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    print_banner();

    let outcome = if cli.all {
        run_full_suite()
    } else if let Some(case_name) = cli.case {
        // Handle -c/--case flag
        run_case(&case_name)
    } else {
        match cli.command {
            Some(Commands::Case { name }) => run_case(&name),
            Some(Commands::List) => {
                list_cases();
                Ok(())
            }
            None => {
                // No arguments provided
                println!("\nNo benchmark specified. Use one of:");
                println!("  pbuf-bench -a              # Run all benchmarks");
                println!("  pbuf-bench -c <case>       # Run specific case");
                println!("  pbuf-bench case <case>     # Run specific case");
                println!("  pbuf-bench list            # List available cases");
                println!("  pbuf-bench --help          # Show help");
                println!("\nFor a quick start, try: pbuf-bench -c quick");
                Ok(())
            }
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
