// Core module: strategy selector, operation names and error taxonomy (NO I/O, NO synchronization)
pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
