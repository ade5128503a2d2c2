// pbuf-run: drive producers and consumers through a protected bounded buffer
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use pbuf_core::{AccessMode, Strategy};
use pbuf_harness::{run, HarnessConfig, HarnessError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pbuf-run", version)]
#[command(about = "Run producers and consumers against a protected bounded buffer")]
#[command(after_help = "Settings are layered: defaults, then CONFIG_FILE, then PBUF_* \
environment variables, then flags. Log level follows RUST_LOG (default: info).")]
struct Cli {
    /// TOML file with capacity, producers, consumers, strategy, ...
    config: Option<PathBuf>,

    /// monitor | semaphore (or 0 | 1)
    #[arg(short, long)]
    strategy: Option<Strategy>,

    /// Buffer capacity in items
    #[arg(short, long)]
    capacity: Option<usize>,

    #[arg(short, long)]
    producers: Option<usize>,

    #[arg(short = 'n', long)]
    consumers: Option<usize>,

    /// Items each producer enqueues
    #[arg(short, long)]
    items: Option<u64>,

    /// blocking | non-blocking | timed
    #[arg(long)]
    producer_mode: Option<AccessMode>,

    /// blocking | non-blocking | timed
    #[arg(long)]
    consumer_mode: Option<AccessMode>,

    /// Deadline distance for timed mode, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl Cli {
    fn apply(&self, config: &mut HarnessConfig) {
        if let Some(v) = self.strategy {
            config.strategy = v;
        }
        if let Some(v) = self.capacity {
            config.capacity = v;
        }
        if let Some(v) = self.producers {
            config.producers = v;
        }
        if let Some(v) = self.consumers {
            config.consumers = v;
        }
        if let Some(v) = self.items {
            config.items_per_producer = v;
        }
        if let Some(v) = self.producer_mode {
            config.producer_mode = v;
        }
        if let Some(v) = self.consumer_mode {
            config.consumer_mode = v;
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout = Duration::from_millis(ms);
        }
    }
}

fn load_config(cli: &Cli) -> Result<HarnessConfig, HarnessError> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };
    config.apply_env();
    cli.apply(&mut config);
    Ok(config)
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();

    let report = load_config(&cli).and_then(|config| run(&config));
    match report {
        Ok(report) => println!("{report}"),
        Err(e) => {
            eprintln!("pbuf-run: {e}");
            process::exit(1);
        }
    }
}
