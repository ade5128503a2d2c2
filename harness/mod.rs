//! Producer/consumer harness for the protected bounded buffers.
//!
//! A run spawns `producers` threads that each enqueue `items_per_producer`
//! [`Item`]s and `consumers` threads that drain them, every role using the
//! operation family its [`AccessMode`](pbuf_core::AccessMode) selects. When
//! all produced items have been collected the consumers are stopped and the
//! run is verified: every item seen exactly once, and each consumer seeing
//! any one producer's items in the order they were made.
//!
//! ```no_run
//! use pbuf_harness::{run, HarnessConfig};
//!
//! let report = run(&HarnessConfig::default()).unwrap();
//! println!("{report}");
//! ```
pub mod config;
pub mod roles;
mod run;

pub use config::{ConfigError, HarnessConfig};
pub use roles::{ConsumerStats, Item, ProducerStats};
pub use run::{run, verify, HarnessError, RunReport};
