// src/pipeline/sink.rs

use async_trait::async_trait;

use super::types::SinkError;

/// Downstream bulk receiver of batches.
///
/// Called by a single consumer, one batch at a time. `Ok(false)` means the
/// sink refused the batch without raising an error; it is counted as a
/// failed batch like `Err`.
#[async_trait]
pub trait Sink<T>: Send + Sync {
    async fn deliver(&self, batch: Vec<T>) -> Result<bool, SinkError>;
}

#[async_trait]
impl<T, F, Fut> Sink<T> for F
where
    F: Fn(Vec<T>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<bool, SinkError>> + Send,
    T: Send + 'static,
{
    async fn deliver(&self, batch: Vec<T>) -> Result<bool, SinkError> {
        self(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_closure_sink() {
        let received = Arc::new(AtomicUsize::new(0));
        let counter = received.clone();
        let sink = move |batch: Vec<u32>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(batch.len(), Ordering::SeqCst);
                Ok::<_, SinkError>(batch.len() < 3)
            }
        };

        assert!(sink.deliver(vec![1, 2]).await.unwrap());
        assert!(!sink.deliver(vec![1, 2, 3]).await.unwrap());
        assert_eq!(received.load(Ordering::SeqCst), 5);
    }
}
