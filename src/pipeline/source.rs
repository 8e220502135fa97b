use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use super::types::SourceError;

/// An independent producer of items.
///
/// Each source is owned by exactly one producer task, which drains
/// [`enumerate`](Source::enumerate) in order and stops at the first error.
pub trait Source<T>: Send + Sync {
    /// Name used in progress reports and error summaries.
    fn id(&self) -> &str;

    /// Number of items the source expects to yield, if known up front.
    fn len_hint(&self) -> Option<usize> {
        None
    }

    /// Progress label for the item at `index`.
    fn label(&self, index: usize, _item: &T) -> String {
        format!("{}:{}", self.id(), index)
    }

    /// Lazily yields the source's items. The stream is finite.
    fn enumerate(&self) -> BoxStream<'_, Result<T, SourceError>>;
}

/// Finds the sources a run should read.
#[async_trait]
pub trait SourceCatalog<T>: Send + Sync {
    async fn discover(&self) -> Result<Vec<Box<dyn Source<T>>>, SourceError>;
}

/// A source backed by items already in memory.
pub struct VecSource<T> {
    id: String,
    items: Vec<T>,
}

impl<T> VecSource<T> {
    pub fn new(id: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            id: id.into(),
            items,
        }
    }
}

impl<T> Source<T> for VecSource<T>
where
    T: Clone + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }

    fn enumerate(&self) -> BoxStream<'_, Result<T, SourceError>> {
        stream::iter(self.items.iter().cloned().map(Ok)).boxed()
    }
}

/// Drops sources whose id is on the exclusion list.
pub fn exclude_sources<T>(
    sources: Vec<Box<dyn Source<T>>>,
    excluded: &[String],
) -> Vec<Box<dyn Source<T>>> {
    sources
        .into_iter()
        .filter(|source| !excluded.iter().any(|id| id == source.id()))
        .collect()
}
