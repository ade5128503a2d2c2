// Harness configuration: defaults < TOML file < PBUF_* environment < CLI flags
//
// Environment variables:
// PBUF_CAPACITY: buffer capacity in items (default: 8)
// PBUF_PRODUCERS / PBUF_CONSUMERS: thread counts (default: 2 / 2)
// PBUF_STRATEGY: monitor|semaphore, or 0|1 (default: monitor)
// PBUF_ITEMS_PER_PRODUCER: values each producer enqueues (default: 1000)
// PBUF_PRODUCER_MODE / PBUF_CONSUMER_MODE: blocking|non-blocking|timed (default: blocking)
// PBUF_TIMEOUT_MS: deadline for timed mode (default: 50)
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use pbuf_core::{AccessMode, BufferError, Strategy};
use serde::Deserialize;

const DEFAULT_CAPACITY: usize = 8;
const DEFAULT_PRODUCERS: usize = 2;
const DEFAULT_CONSUMERS: usize = 2;
const DEFAULT_ITEMS_PER_PRODUCER: u64 = 1000;
const DEFAULT_TIMEOUT_MS: u64 = 50;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },
    #[error(transparent)]
    Capacity(#[from] BufferError),
    #[error("{producers} producer(s) have items to enqueue but no consumer would drain them")]
    NoConsumers { producers: usize },
}

/// Everything a run needs. Build with [`HarnessConfig::default`] or
/// [`HarnessConfig::from_file`], then layer overrides on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub capacity: usize,
    pub producers: usize,
    pub consumers: usize,
    pub strategy: Strategy,
    pub items_per_producer: u64,
    pub producer_mode: AccessMode,
    pub consumer_mode: AccessMode,
    /// Deadline distance for `offer`/`poll` in timed mode.
    pub timeout: Duration,
    /// Simulated work between two enqueues.
    pub producer_pause: Duration,
    /// Simulated work between two dequeues.
    pub consumer_pause: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            capacity: DEFAULT_CAPACITY,
            producers: DEFAULT_PRODUCERS,
            consumers: DEFAULT_CONSUMERS,
            strategy: Strategy::Monitor,
            items_per_producer: DEFAULT_ITEMS_PER_PRODUCER,
            producer_mode: AccessMode::Blocking,
            consumer_mode: AccessMode::Blocking,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            producer_pause: Duration::ZERO,
            consumer_pause: Duration::ZERO,
        }
    }
}

// On-disk shape. Selectors are strings so that "0"/"1" work as in older files.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    capacity: Option<usize>,
    producers: Option<usize>,
    consumers: Option<usize>,
    strategy: Option<String>,
    items_per_producer: Option<u64>,
    producer_mode: Option<String>,
    consumer_mode: Option<String>,
    timeout_ms: Option<u64>,
    producer_pause_us: Option<u64>,
    consumer_pause_us: Option<u64>,
}

impl HarnessConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Defaults overridden by whatever keys `text` sets.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(text)?;
        let mut config = HarnessConfig::default();

        if let Some(v) = file.capacity {
            config.capacity = v;
        }
        if let Some(v) = file.producers {
            config.producers = v;
        }
        if let Some(v) = file.consumers {
            config.consumers = v;
        }
        if let Some(v) = file.strategy {
            config.strategy = parse_field("strategy", &v)?;
        }
        if let Some(v) = file.items_per_producer {
            config.items_per_producer = v;
        }
        if let Some(v) = file.producer_mode {
            config.producer_mode = parse_field("producer_mode", &v)?;
        }
        if let Some(v) = file.consumer_mode {
            config.consumer_mode = parse_field("consumer_mode", &v)?;
        }
        if let Some(v) = file.timeout_ms {
            config.timeout = Duration::from_millis(v);
        }
        if let Some(v) = file.producer_pause_us {
            config.producer_pause = Duration::from_micros(v);
        }
        if let Some(v) = file.consumer_pause_us {
            config.consumer_pause = Duration::from_micros(v);
        }
        Ok(config)
    }

    /// Applies `PBUF_*` variables from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|var| std::env::var(var).ok());
    }

    /// Applies `PBUF_*` overrides read through `lookup`. Values that do not
    /// parse are ignored with a warning and the current setting is kept.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env_value(&lookup, "PBUF_CAPACITY") {
            self.capacity = v;
        }
        if let Some(v) = env_value(&lookup, "PBUF_PRODUCERS") {
            self.producers = v;
        }
        if let Some(v) = env_value(&lookup, "PBUF_CONSUMERS") {
            self.consumers = v;
        }
        if let Some(v) = env_value(&lookup, "PBUF_STRATEGY") {
            self.strategy = v;
        }
        if let Some(v) = env_value(&lookup, "PBUF_ITEMS_PER_PRODUCER") {
            self.items_per_producer = v;
        }
        if let Some(v) = env_value(&lookup, "PBUF_PRODUCER_MODE") {
            self.producer_mode = v;
        }
        if let Some(v) = env_value(&lookup, "PBUF_CONSUMER_MODE") {
            self.consumer_mode = v;
        }
        if let Some(ms) = env_value(&lookup, "PBUF_TIMEOUT_MS") {
            self.timeout = Duration::from_millis(ms);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(BufferError::InvalidCapacity(self.capacity).into());
        }
        if self.consumers == 0 && self.total_items() > 0 {
            return Err(ConfigError::NoConsumers {
                producers: self.producers,
            });
        }
        Ok(())
    }

    pub fn total_items(&self) -> u64 {
        self.producers as u64 * self.items_per_producer
    }
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

fn env_value<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<T> {
    let raw = lookup(var)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_gives_defaults() {
        let config = HarnessConfig::from_toml_str("").unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_overrides_selected_keys() {
        let config = HarnessConfig::from_toml_str(
            r#"
            capacity = 3
            consumers = 5
            strategy = "1"
            consumer_mode = "timed"
            timeout_ms = 7
            producer_pause_us = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.capacity, 3);
        assert_eq!(config.producers, DEFAULT_PRODUCERS);
        assert_eq!(config.consumers, 5);
        assert_eq!(config.strategy, Strategy::Semaphore);
        assert_eq!(config.producer_mode, AccessMode::Blocking);
        assert_eq!(config.consumer_mode, AccessMode::Timed);
        assert_eq!(config.timeout, Duration::from_millis(7));
        assert_eq!(config.producer_pause, Duration::from_micros(250));
    }

    #[test]
    fn malformed_files_are_rejected() {
        assert!(matches!(
            HarnessConfig::from_toml_str("capacity = -4"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            HarnessConfig::from_toml_str("buffer_size = 4"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            HarnessConfig::from_toml_str("strategy = \"spin\""),
            Err(ConfigError::InvalidValue { field: "strategy", .. })
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = HarnessConfig::from_file(Path::new("/nonexistent/pbuf.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pbuf.toml"));
    }

    #[test]
    fn env_overrides_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = [
            ("PBUF_CAPACITY", "16"),
            ("PBUF_STRATEGY", "semaphore"),
            ("PBUF_PRODUCERS", "many"),
            ("PBUF_PRODUCER_MODE", "non-blocking"),
            ("PBUF_TIMEOUT_MS", "5"),
        ]
        .into_iter()
        .collect();

        let mut config = HarnessConfig::default();
        config.apply_env_from(|var| vars.get(var).map(|v| v.to_string()));

        assert_eq!(config.capacity, 16);
        assert_eq!(config.strategy, Strategy::Semaphore);
        assert_eq!(config.producers, DEFAULT_PRODUCERS);
        assert_eq!(config.producer_mode, AccessMode::NonBlocking);
        assert_eq!(config.timeout, Duration::from_millis(5));
    }

    #[test]
    fn validation() {
        let zero = HarnessConfig {
            capacity: 0,
            ..HarnessConfig::default()
        };
        assert!(matches!(
            zero.validate(),
            Err(ConfigError::Capacity(BufferError::InvalidCapacity(0)))
        ));

        let undrained = HarnessConfig {
            consumers: 0,
            ..HarnessConfig::default()
        };
        assert!(matches!(undrained.validate(), Err(ConfigError::NoConsumers { producers: 2 })));

        let idle = HarnessConfig {
            producers: 0,
            consumers: 0,
            ..HarnessConfig::default()
        };
        assert!(idle.validate().is_ok());
    }
}
