//! Knapsack Core — error taxonomy, process configuration, inbound records.

pub mod config;
pub mod error;
pub mod record;

pub use config::{KnapsackConfig, MAX_BATCH_TOP_K, MAX_TOP_K};
pub use error::{Error, Result};
pub use record::{Need, Record, Resource};
