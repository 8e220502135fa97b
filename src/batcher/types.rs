use thiserror::Error;

/// Errors raised by the [`Batcher`](super::Batcher) itself.
///
/// Both variants are invariant violations: a correctly wired pipeline never
/// produces them, so the run treats them as fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatcherError {
    /// An item was offered after the batcher was closed.
    #[error("batcher is closed")]
    Closed,

    /// `close` was called a second time.
    #[error("batcher was already closed")]
    AlreadyClosed,
}

/// Rejected sizing configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("batch size must be greater than zero")]
    ZeroBatchSize,

    #[error("capacity {capacity} is smaller than batch size {batch_size}")]
    CapacityBelowBatchSize { capacity: usize, batch_size: usize },

    #[error("capacity {capacity} exceeds the supported maximum {max}")]
    CapacityTooLarge { capacity: usize, max: usize },

    #[error("missing config field: {0}")]
    MissingField(&'static str),
}

/// Counters describing the batcher's traffic so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatcherStats {
    /// Items taken in by `accept`.
    pub accepted: usize,
    /// Batches moved to the ready queue.
    pub batches_released: usize,
    /// Items whose batch has been acknowledged by the reader.
    pub acknowledged: usize,
    /// Highest number of accepted, unacknowledged items seen at once.
    pub peak_in_flight: usize,
}

impl BatcherStats {
    /// Items accepted but not yet acknowledged.
    pub fn in_flight(&self) -> usize {
        self.accepted - self.acknowledged
    }
}
