use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::progress::ProgressReporter;
use super::sink::Sink;
use super::types::BatchFailure;
use crate::batcher::BatchReceiver;

#[derive(Debug, Default)]
pub(crate) struct ConsumerReport {
    pub(crate) total_items: usize,
    pub(crate) total_batches: usize,
    pub(crate) failed_batches: usize,
    pub(crate) batch_failures: Vec<BatchFailure>,
    pub(crate) delivery_time: Duration,
}

/// Delivers every ready batch to `sink`, one at a time, until the batcher
/// is exhausted. A failed batch is recorded and the loop moves on.
pub(crate) async fn consume<T>(
    mut receiver: BatchReceiver<T>,
    sink: Box<dyn Sink<T>>,
    reporter: Arc<dyn ProgressReporter>,
) -> ConsumerReport
where
    T: Send + 'static,
{
    let mut report = ConsumerReport::default();

    while let Some(batch) = receiver.receive_next().await {
        let batch_index = report.total_batches;
        let (items, ack) = batch.into_parts();
        let size = ack.items();

        let started = Instant::now();
        let outcome = sink.deliver(items).await;
        let elapsed = started.elapsed();
        ack.acknowledge();

        let success = matches!(outcome, Ok(true));
        report.total_items += size;
        report.total_batches += 1;
        report.delivery_time += elapsed;

        if success {
            debug!(batch = batch_index, size, ?elapsed, "batch delivered");
        } else {
            report.failed_batches += 1;
            let error = outcome.err();
            match &error {
                Some(e) => warn!(batch = batch_index, size, error = %e, "batch delivery failed"),
                None => warn!(batch = batch_index, size, "sink rejected batch"),
            }
            report.batch_failures.push(BatchFailure {
                batch_index,
                size,
                error,
            });
        }
        reporter.on_batch_delivered(size, success, elapsed);
    }

    debug!(
        batches = report.total_batches,
        items = report.total_items,
        failed = report.failed_batches,
        "consumer drained batcher"
    );
    report
}
