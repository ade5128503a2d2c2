// cpu_monitor.rs - Process CPU usage sampled while a benchmark runs
use sysinfo::{System, RefreshKind, CpuRefreshKind, ProcessRefreshKind, Pid};
use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use std::thread;
use std::time::Duration;

const SAMPLE_INTERVAL: Duration = Duration::from_millis(50);

pub struct CpuStats {
    pub avg_cpu_percent: f32,
    pub peak_cpu_percent: f32,
    pub samples: usize,
}

impl CpuStats {
    fn from_samples(samples: &[f32]) -> Self {
        let avg = if !samples.is_empty() {
            samples.iter().sum::<f32>() / samples.len() as f32
        } else {
            0.0
        };

        CpuStats {
            avg_cpu_percent: avg,
            peak_cpu_percent: samples.iter().copied().fold(0.0f32, f32::max),
            samples: samples.len(),
        }
    }
}

fn sample_until(pid: Pid, stop: &AtomicBool) -> CpuStats {
    let mut sys = System::new_with_specifics(
        RefreshKind::new()
            .with_cpu(CpuRefreshKind::everything())
            .with_processes(ProcessRefreshKind::everything())
    );

    // First refresh only establishes the baseline for cpu_usage()
    sys.refresh_process(pid);
    thread::sleep(SAMPLE_INTERVAL);

    let mut samples = vec![];
    while !stop.load(Ordering::Relaxed) {
        if sys.refresh_process(pid) {
            if let Some(process) = sys.process(pid) {
                samples.push(process.cpu_usage());
            }
        }
        thread::sleep(SAMPLE_INTERVAL);
    }

    CpuStats::from_samples(&samples)
}

/// Runs `benchmark_fn` on the calling thread while a monitor thread samples
/// this process. Stats are `None` when the process cannot be observed.
pub fn run_with_cpu_monitor<F, R>(name: &str, benchmark_fn: F) -> (R, Option<CpuStats>)
where
    F: FnOnce() -> R,
{
    println!("\n=== Running {} with CPU monitoring ===", name);

    let monitor = match sysinfo::get_current_pid() {
        Ok(pid) => {
            let stop = Arc::new(AtomicBool::new(false));
            let stop_clone = Arc::clone(&stop);
            Some((stop, thread::spawn(move || sample_until(pid, &stop_clone))))
        }
        Err(e) => {
            eprintln!("CPU monitoring unavailable: {}", e);
            None
        }
    };

    let result = benchmark_fn();

    let cpu_stats = monitor.and_then(|(stop, handle)| {
        stop.store(true, Ordering::Relaxed);
        handle.join().ok()
    });

    if let Some(stats) = &cpu_stats {
        println!("CPU Stats: avg={:.1}%, peak={:.1}%, samples={}",
            stats.avg_cpu_percent,
            stats.peak_cpu_percent,
            stats.samples
        );
    }

    (result, cpu_stats)
}

pub fn print_cpu_results(rows: &[(String, f64, Option<CpuStats>)]) {
    println!("\n╔═══════════════════════════════════════════════════════════════════════════╗");
    println!("║                         CPU USAGE BY STRATEGY                             ║");
    println!("╠═══════════════════════════════════════════════════════════════════════════╣");
    println!("║ Target      │   Throughput │ Avg CPU │ Peak CPU │ Samples │ Items/CPU-% ║");
    println!("╠═══════════════════════════════════════════════════════════════════════════╣");

    for (label, throughput, stats) in rows {
        match stats {
            Some(s) => println!("║ {:<11} │ {:>10.0}/s │ {:>6.1}% │ {:>7.1}% │ {:>7} │ {:>11.0} ║",
                label,
                throughput,
                s.avg_cpu_percent,
                s.peak_cpu_percent,
                s.samples,
                throughput / f64::from(s.avg_cpu_percent.max(1.0))
            ),
            None => println!("║ {:<11} │ {:>10.0}/s │ {:>7} │ {:>8} │ {:>7} │ {:>11} ║",
                label, throughput, "-", "-", "-", "-"),
        }
    }

    println!("╚═══════════════════════════════════════════════════════════════════════════╝");
}
