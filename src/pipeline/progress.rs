use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::types::SourceError;

/// Observer of pipeline progress.
///
/// Calls come from several tasks at once and must return quickly; a reporter
/// has no way to slow the pipeline down. Every method defaults to a no-op.
pub trait ProgressReporter: Send + Sync {
    fn on_sources_discovered(&self, _count: usize, _expected_items: Option<usize>) {}

    /// An item from `source_id` was accepted by the batcher.
    fn on_item_processed(&self, _source_id: &str, _label: &str) {}

    fn on_batch_delivered(&self, _size: usize, _success: bool, _elapsed: Duration) {}

    fn on_source_done(&self, _source_id: &str) {}

    fn on_source_failed(&self, _source_id: &str, _error: &SourceError) {}
}

/// Reporter that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {}

/// Renders progress as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingReporter {
    expected: Mutex<Option<usize>>,
    delivered: AtomicUsize,
}

impl TracingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn expected(&self) -> MutexGuard<'_, Option<usize>> {
        self.expected.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProgressReporter for TracingReporter {
    fn on_sources_discovered(&self, count: usize, expected_items: Option<usize>) {
        // A new run starts counting from zero.
        *self.expected() = expected_items;
        self.delivered.store(0, Ordering::Relaxed);
        info!(sources = count, expected_items, "reading sources");
    }

    fn on_item_processed(&self, source_id: &str, label: &str) {
        trace!(source = source_id, item = label, "item accepted");
    }

    fn on_batch_delivered(&self, size: usize, success: bool, elapsed: Duration) {
        let delivered = self.delivered.fetch_add(size, Ordering::Relaxed) + size;
        let expected = *self.expected();
        match expected {
            Some(expected) => debug!(
                size,
                success,
                ?elapsed,
                delivered,
                expected,
                "batch delivered"
            ),
            None => debug!(size, success, ?elapsed, delivered, "batch delivered"),
        }
        if !success {
            warn!(size, "batch rejected by sink");
        }
    }

    fn on_source_done(&self, source_id: &str) {
        info!(source = source_id, "source done");
    }

    fn on_source_failed(&self, source_id: &str, error: &SourceError) {
        warn!(source = source_id, %error, "source failed");
    }
}

/// Point-in-time copy of a [`ProgressTally`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TallySnapshot {
    pub sources_discovered: usize,
    pub expected_items: Option<usize>,
    pub items_per_source: HashMap<String, usize>,
    pub items_delivered: usize,
    pub batches_delivered: usize,
    pub batches_failed: usize,
    pub sources_done: Vec<String>,
    pub sources_failed: Vec<String>,
}

impl TallySnapshot {
    pub fn items_processed(&self) -> usize {
        self.items_per_source.values().sum()
    }
}

/// Reporter that keeps running totals.
///
/// Totals do not depend on how producers interleave, so they can be compared
/// against exact expectations once a run finishes.
#[derive(Debug, Default)]
pub struct ProgressTally {
    state: Mutex<TallySnapshot>,
}

impl ProgressTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TallySnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, TallySnapshot> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProgressReporter for ProgressTally {
    fn on_sources_discovered(&self, count: usize, expected_items: Option<usize>) {
        let mut state = self.lock();
        state.sources_discovered = count;
        state.expected_items = expected_items;
    }

    fn on_item_processed(&self, source_id: &str, _label: &str) {
        *self
            .lock()
            .items_per_source
            .entry(source_id.to_string())
            .or_default() += 1;
    }

    fn on_batch_delivered(&self, size: usize, success: bool, _elapsed: Duration) {
        let mut state = self.lock();
        state.items_delivered += size;
        state.batches_delivered += 1;
        if !success {
            state.batches_failed += 1;
        }
    }

    fn on_source_done(&self, source_id: &str) {
        self.lock().sources_done.push(source_id.to_string());
    }

    fn on_source_failed(&self, source_id: &str, _error: &SourceError) {
        self.lock().sources_failed.push(source_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_accumulates() {
        let tally = ProgressTally::new();
        tally.on_sources_discovered(2, Some(3));
        tally.on_item_processed("a", "a:0");
        tally.on_item_processed("b", "b:0");
        tally.on_item_processed("a", "a:1");
        tally.on_batch_delivered(2, true, Duration::from_millis(3));
        tally.on_batch_delivered(1, false, Duration::from_millis(1));
        tally.on_source_done("a");
        tally.on_source_failed("b", &SourceError::Panicked("boom".into()));

        let snapshot = tally.snapshot();
        assert_eq!(snapshot.sources_discovered, 2);
        assert_eq!(snapshot.expected_items, Some(3));
        assert_eq!(snapshot.items_per_source["a"], 2);
        assert_eq!(snapshot.items_processed(), 3);
        assert_eq!(snapshot.items_delivered, 3);
        assert_eq!(snapshot.batches_delivered, 2);
        assert_eq!(snapshot.batches_failed, 1);
        assert_eq!(snapshot.sources_done, vec!["a".to_string()]);
        assert_eq!(snapshot.sources_failed, vec!["b".to_string()]);
    }

    #[test]
    fn test_tracing_reporter_does_not_panic_without_discovery() {
        let reporter = TracingReporter::new();
        reporter.on_batch_delivered(4, true, Duration::from_millis(2));
        reporter.on_batch_delivered(4, false, Duration::from_millis(2));
        assert_eq!(reporter.delivered.load(Ordering::Relaxed), 8);
    }

    #[test]
    fn test_tracing_reporter_resets_between_runs() {
        let reporter = TracingReporter::new();
        reporter.on_sources_discovered(2, Some(100));
        reporter.on_batch_delivered(10, true, Duration::from_millis(1));

        reporter.on_sources_discovered(3, Some(40));
        assert_eq!(*reporter.expected(), Some(40));
        assert_eq!(reporter.delivered.load(Ordering::Relaxed), 0);

        reporter.on_sources_discovered(1, None);
        assert_eq!(*reporter.expected(), None);
    }
}
