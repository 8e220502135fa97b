use std::time::Duration;
use thiserror::Error;

use crate::batcher::{BatcherError, ConfigError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single source. Only that source's producer stops.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Enumerating the source failed.
    ///
    /// Preserves the source error for debugging.
    #[error("failed to read source")]
    Read(#[source] BoxError),

    /// The producer reading the source panicked.
    #[error("producer panicked: {0}")]
    Panicked(String),
}

impl SourceError {
    pub fn read<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        SourceError::Read(err.into())
    }
}

/// Failure of a single batch delivery. The consumer moves on to the next batch.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("batch delivery failed")]
    Deliver(#[source] BoxError),
}

impl SinkError {
    pub fn deliver<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        SinkError::Deliver(err.into())
    }
}

/// Errors that end a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("batcher invariant violated: {0}")]
    Batcher(#[from] BatcherError),

    #[error("source discovery failed")]
    Discovery(#[source] SourceError),

    #[error("{0} task failed: {1}")]
    Task(&'static str, String),
}

/// A source that stopped with an error, and how far it got.
#[derive(Debug)]
pub struct SourceFailure {
    pub source_id: String,
    /// Items accepted from the source before it failed. They are still delivered.
    pub items_accepted: usize,
    pub error: SourceError,
}

/// A batch the sink did not take.
#[derive(Debug)]
pub struct BatchFailure {
    /// Zero-based position of the batch in delivery order.
    pub batch_index: usize,
    pub size: usize,
    /// `None` when the sink reported failure without an error.
    pub error: Option<SinkError>,
}

/// Outcome of a finished run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Number of sources the run started with.
    pub sources: usize,
    /// Sum of the sources' length hints, when every source gave one.
    pub expected_items: Option<usize>,
    /// Items handed to the sink, whether or not their batch succeeded.
    pub total_items: usize,
    pub total_batches: usize,
    pub failed_batches: usize,
    pub per_source_errors: Vec<SourceFailure>,
    pub batch_failures: Vec<BatchFailure>,
    /// Time spent inside the sink across all batches.
    pub delivery_time: Duration,
}

impl RunSummary {
    /// True when every source finished and every batch was accepted.
    pub fn is_clean(&self) -> bool {
        self.failed_batches == 0 && self.per_source_errors.is_empty()
    }

    pub fn delivered_items(&self) -> usize {
        let failed: usize = self.batch_failures.iter().map(|f| f.size).sum();
        self.total_items - failed
    }
}
