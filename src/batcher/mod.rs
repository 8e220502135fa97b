pub mod batcher;
pub mod config;
pub mod types;

pub use batcher::{Acknowledgement, BatchReceiver, Batcher, ReadyBatch};
pub use config::{Config, ConfigBuilder};
pub use types::{BatcherError, BatcherStats, ConfigError};
