//! Runs many sources into one sink through a bounded [`Batcher`].
//!
//! A run spawns one producer task per source, a coordinator that closes the
//! batcher once every producer is finished, and a single consumer that hands
//! batches to the sink in order.

mod consumer;
mod producer;
pub mod progress;
pub mod sink;
pub mod source;
pub mod types;

use std::sync::Arc;
use tracing::{info, warn};

use crate::batcher::{Batcher, Config};

pub use progress::{NoopReporter, ProgressReporter, ProgressTally, TallySnapshot, TracingReporter};
pub use sink::Sink;
pub use source::{exclude_sources, Source, SourceCatalog, VecSource};
pub use types::{BatchFailure, PipelineError, RunSummary, SinkError, SourceError, SourceFailure};

/// One execution of sources → batcher → sink.
pub struct Pipeline<T> {
    config: Arc<Config>,
    sources: Vec<Box<dyn Source<T>>>,
    sink: Box<dyn Sink<T>>,
    reporter: Arc<dyn ProgressReporter>,
}

impl<T> Pipeline<T>
where
    T: Send + 'static,
{
    pub fn new<S>(config: Arc<Config>, sink: S) -> Self
    where
        S: Sink<T> + 'static,
    {
        Pipeline {
            config,
            sources: Vec::new(),
            sink: Box::new(sink),
            reporter: Arc::new(NoopReporter),
        }
    }

    /// Builds a pipeline over the sources a catalog discovers.
    pub async fn from_catalog<S>(
        config: Arc<Config>,
        catalog: &dyn SourceCatalog<T>,
        sink: S,
    ) -> Result<Self, PipelineError>
    where
        S: Sink<T> + 'static,
    {
        config.validate()?;
        let sources = catalog.discover().await.map_err(PipelineError::Discovery)?;
        Ok(Self::new(config, sink).with_sources(sources))
    }

    pub fn with_source<S>(mut self, source: S) -> Self
    where
        S: Source<T> + 'static,
    {
        self.sources.push(Box::new(source));
        self
    }

    pub fn with_sources(mut self, sources: Vec<Box<dyn Source<T>>>) -> Self {
        self.sources.extend(sources);
        self
    }

    /// Drops sources whose id is listed.
    pub fn excluding(mut self, ids: &[String]) -> Self {
        self.sources = exclude_sources(self.sources, ids);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    /// Runs every source to completion and delivers all accepted items.
    ///
    /// Source and sink failures are collected into the summary. An error is
    /// returned only for a bad config, a batcher invariant violation, or a
    /// coordinator/consumer task that died.
    pub async fn run(self) -> Result<RunSummary, PipelineError> {
        let Pipeline {
            config,
            sources,
            sink,
            reporter,
        } = self;

        let (batcher, receiver) = Batcher::channel(config.clone())?;

        let source_count = sources.len();
        let expected_items = expected_total(&sources);
        info!(
            sources = source_count,
            expected_items,
            batch_size = config.batch_size(),
            capacity = config.capacity(),
            "starting pipeline run"
        );
        reporter.on_sources_discovered(source_count, expected_items);

        let producers: Vec<_> = sources
            .into_iter()
            .map(|source| producer::spawn_producer(source, batcher.clone(), reporter.clone()))
            .collect();
        let coordinator = tokio::spawn(producer::coordinate(producers, batcher, reporter.clone()));
        let consumer = tokio::spawn(consumer::consume(receiver, sink, reporter));

        let (coordinated, consumed) = tokio::join!(coordinator, consumer);
        let consumed = consumed.map_err(|e| PipelineError::Task("consumer", e.to_string()))?;
        let reports = coordinated.map_err(|e| PipelineError::Task("coordinator", e.to_string()))??;

        let per_source_errors: Vec<SourceFailure> = reports
            .into_iter()
            .filter_map(|report| {
                report.error.map(|error| SourceFailure {
                    source_id: report.source_id,
                    items_accepted: report.items_accepted,
                    error,
                })
            })
            .collect();

        let summary = RunSummary {
            sources: source_count,
            expected_items,
            total_items: consumed.total_items,
            total_batches: consumed.total_batches,
            failed_batches: consumed.failed_batches,
            per_source_errors,
            batch_failures: consumed.batch_failures,
            delivery_time: consumed.delivery_time,
        };

        if summary.is_clean() {
            info!(
                items = summary.total_items,
                batches = summary.total_batches,
                "pipeline run finished"
            );
        } else {
            warn!(
                items = summary.total_items,
                batches = summary.total_batches,
                failed_batches = summary.failed_batches,
                failed_sources = summary.per_source_errors.len(),
                "pipeline run finished with failures"
            );
        }
        Ok(summary)
    }
}

/// Sum of the sources' length hints, saturating; `None` if any source has none.
fn expected_total<T>(sources: &[Box<dyn Source<T>>]) -> Option<usize> {
    sources.iter().try_fold(0usize, |total, source| {
        source.len_hint().map(|hint| total.saturating_add(hint))
    })
}
