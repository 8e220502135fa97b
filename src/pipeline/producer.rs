use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::progress::ProgressReporter;
use super::source::Source;
use super::types::SourceError;
use crate::batcher::{Batcher, BatcherError};

/// How one producer ended.
#[derive(Debug)]
pub(crate) struct ProducerReport {
    pub(crate) source_id: String,
    pub(crate) items_accepted: usize,
    pub(crate) error: Option<SourceError>,
}

pub(crate) struct ProducerHandle {
    source_id: String,
    accepted: Arc<AtomicUsize>,
    handle: JoinHandle<Result<ProducerReport, BatcherError>>,
}

/// Starts the task that drains `source` into `batcher`.
pub(crate) fn spawn_producer<T>(
    source: Box<dyn Source<T>>,
    batcher: Batcher<T>,
    reporter: Arc<dyn ProgressReporter>,
) -> ProducerHandle
where
    T: Send + 'static,
{
    let source_id = source.id().to_string();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();

    let handle = tokio::spawn(async move { produce(source, batcher, reporter, counter).await });

    ProducerHandle {
        source_id,
        accepted,
        handle,
    }
}

async fn produce<T>(
    source: Box<dyn Source<T>>,
    batcher: Batcher<T>,
    reporter: Arc<dyn ProgressReporter>,
    accepted: Arc<AtomicUsize>,
) -> Result<ProducerReport, BatcherError>
where
    T: Send + 'static,
{
    let source_id = source.id().to_string();
    debug!(source = %source_id, "producer started");

    let mut items = source.enumerate();
    let mut index = 0;
    while let Some(next) = items.next().await {
        match next {
            Ok(item) => {
                let label = source.label(index, &item);
                batcher.accept(item).await?;
                index += 1;
                accepted.store(index, Ordering::Release);
                reporter.on_item_processed(&source_id, &label);
            }
            Err(error) => {
                warn!(source = %source_id, items = index, %error, "source failed, producer stopping");
                reporter.on_source_failed(&source_id, &error);
                return Ok(ProducerReport {
                    source_id,
                    items_accepted: index,
                    error: Some(error),
                });
            }
        }
    }

    debug!(source = %source_id, items = index, "producer finished");
    reporter.on_source_done(&source_id);
    Ok(ProducerReport {
        source_id,
        items_accepted: index,
        error: None,
    })
}

/// Waits for every producer, then closes the batcher exactly once.
///
/// A producer that panicked is reported as a failed source. A batcher fault
/// from any producer is returned after the batcher has been closed, so the
/// consumer still drains what was accepted.
pub(crate) async fn coordinate<T>(
    producers: Vec<ProducerHandle>,
    batcher: Batcher<T>,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<Vec<ProducerReport>, BatcherError>
where
    T: Send + 'static,
{
    let mut reports = Vec::with_capacity(producers.len());
    let mut fault = None;

    for producer in producers {
        match producer.handle.await {
            Ok(Ok(report)) => reports.push(report),
            Ok(Err(e)) => {
                error!(source = %producer.source_id, error = %e, "producer hit batcher fault");
                fault.get_or_insert(e);
            }
            Err(e) => {
                let error = SourceError::Panicked(e.to_string());
                error!(source = %producer.source_id, %error, "producer task died");
                reporter.on_source_failed(&producer.source_id, &error);
                reports.push(ProducerReport {
                    source_id: producer.source_id,
                    items_accepted: producer.accepted.load(Ordering::Acquire),
                    error: Some(error),
                });
            }
        }
    }

    debug!(producers = reports.len(), "all producers finished, closing batcher");
    batcher.close().await?;

    match fault {
        Some(e) => Err(e),
        None => Ok(reports),
    }
}
