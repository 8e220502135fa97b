use std::collections::VecDeque;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, Semaphore};
use tracing::{debug, trace};

use super::config::Config;
use super::types::{BatcherError, BatcherStats, ConfigError};

struct State<T> {
    staging: Vec<T>,
    ready: VecDeque<Vec<T>>,
    closed: bool,
    exhausted: bool,
    accepted: usize,
    batches_released: usize,
}

impl<T> State<T> {
    fn release_staging(&mut self, batch_size: usize) {
        let batch = mem::replace(&mut self.staging, Vec::with_capacity(batch_size));
        self.ready.push_back(batch);
        self.batches_released += 1;
    }
}

/// Capacity bookkeeping shared with outstanding [`Acknowledgement`]s.
struct Ledger {
    permits: Semaphore,
    acknowledged: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Ledger {
    fn release(&self, items: usize) {
        // Counted before the permits go back so a woken producer never
        // observes more in-flight items than there are.
        self.acknowledged.fetch_add(items, Ordering::SeqCst);
        self.permits.add_permits(items);
    }
}

struct Shared<T> {
    config: Arc<Config>,
    state: Mutex<State<T>>,
    ledger: Arc<Ledger>,
    ready: Notify,
}

/// Producer-side handle of a bounded batching buffer.
///
/// Items offered through [`accept`](Batcher::accept) are grouped into batches
/// of `batch_size` and handed to the single [`BatchReceiver`]. At most
/// `capacity` items may be accepted and not yet acknowledged at any moment;
/// producers beyond that bound wait.
pub struct Batcher<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Batcher<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

/// Reader side of a [`Batcher`]. There is exactly one per batcher.
pub struct BatchReceiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Batcher<T>
where
    T: Send + 'static,
{
    /// Creates a batcher and its only receiver.
    pub fn channel(config: Arc<Config>) -> Result<(Self, BatchReceiver<T>), ConfigError> {
        config.validate()?;

        let ledger = Arc::new(Ledger {
            permits: Semaphore::new(config.capacity),
            acknowledged: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        });
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                staging: Vec::with_capacity(config.batch_size),
                ready: VecDeque::new(),
                closed: false,
                exhausted: false,
                accepted: 0,
                batches_released: 0,
            }),
            config,
            ledger,
            ready: Notify::new(),
        });

        Ok((
            Self {
                shared: shared.clone(),
            },
            BatchReceiver { shared },
        ))
    }

    /// Adds one item, waiting while the batcher is at capacity.
    pub async fn accept(&self, item: T) -> Result<(), BatcherError> {
        let ledger = &self.shared.ledger;
        let permit = ledger
            .permits
            .acquire()
            .await
            .map_err(|_| BatcherError::Closed)?;

        let batch_size = self.shared.config.batch_size;
        let mut state = self.shared.state.lock().await;
        if state.closed {
            return Err(BatcherError::Closed);
        }
        permit.forget();

        state.accepted += 1;
        let in_flight = state
            .accepted
            .saturating_sub(ledger.acknowledged.load(Ordering::SeqCst));
        ledger.peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        state.staging.push(item);
        if state.staging.len() >= batch_size {
            state.release_staging(batch_size);
            trace!(batch = state.batches_released, "batch ready");
            drop(state);
            self.shared.ready.notify_one();
        }
        Ok(())
    }

    /// Flushes any partial batch and stops accepting items.
    pub async fn close(&self) -> Result<(), BatcherError> {
        let mut state = self.shared.state.lock().await;
        if state.closed {
            return Err(BatcherError::AlreadyClosed);
        }
        state.closed = true;

        if !state.staging.is_empty() {
            let partial = state.staging.len();
            state.release_staging(0);
            debug!(items = partial, "flushed partial batch on close");
        }
        let released = state.batches_released;
        drop(state);

        self.shared.ledger.permits.close();
        self.shared.ready.notify_one();
        debug!(batches = released, "batcher closed");
        Ok(())
    }

    pub async fn stats(&self) -> BatcherStats {
        stats(&self.shared).await
    }
}

impl<T> BatchReceiver<T>
where
    T: Send + 'static,
{
    /// Waits for the next ready batch.
    ///
    /// Returns `None` once the batcher is closed and every released batch
    /// has been handed out.
    pub async fn receive_next(&mut self) -> Option<ReadyBatch<T>> {
        loop {
            let notified = self.shared.ready.notified();
            {
                let mut state = self.shared.state.lock().await;
                if let Some(items) = state.ready.pop_front() {
                    return Some(ReadyBatch {
                        ack: Acknowledgement {
                            ledger: self.shared.ledger.clone(),
                            items: items.len(),
                        },
                        items,
                    });
                }
                if state.closed {
                    if !state.exhausted {
                        state.exhausted = true;
                        debug!(batches = state.batches_released, "batcher exhausted");
                    }
                    return None;
                }
            }
            notified.await;
        }
    }

    pub async fn stats(&self) -> BatcherStats {
        stats(&self.shared).await
    }
}

impl<T> Drop for BatchReceiver<T> {
    fn drop(&mut self) {
        // Nobody is left to acknowledge; waiting producers fail with `Closed`.
        self.shared.ledger.permits.close();
    }
}

async fn stats<T>(shared: &Shared<T>) -> BatcherStats {
    let state = shared.state.lock().await;
    BatcherStats {
        accepted: state.accepted,
        batches_released: state.batches_released,
        acknowledged: shared.ledger.acknowledged.load(Ordering::SeqCst),
        peak_in_flight: shared.ledger.peak_in_flight.load(Ordering::SeqCst),
    }
}

/// A batch handed out by [`BatchReceiver::receive_next`].
///
/// Its items count against the batcher's capacity until the batch, or the
/// [`Acknowledgement`] split off it, is dropped.
#[must_use = "dropping a batch acknowledges it"]
pub struct ReadyBatch<T> {
    items: Vec<T>,
    ack: Acknowledgement,
}

impl<T> ReadyBatch<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Separates the items from the capacity they hold, so the items can be
    /// moved into a sink while the capacity stays reserved.
    pub fn into_parts(self) -> (Vec<T>, Acknowledgement) {
        (self.items, self.ack)
    }

    pub fn acknowledge(self) {}
}

/// Returns a delivered batch's capacity to the batcher when dropped.
#[must_use = "dropping an acknowledgement releases capacity immediately"]
pub struct Acknowledgement {
    ledger: Arc<Ledger>,
    items: usize,
}

impl Acknowledgement {
    pub fn items(&self) -> usize {
        self.items
    }

    pub fn acknowledge(self) {}
}

impl Drop for Acknowledgement {
    fn drop(&mut self) {
        self.ledger.release(self.items);
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
