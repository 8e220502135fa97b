//! Ships several fake event logs to a printing bulk sink.
//!
//! Run with: cargo run --example log_shipper

use async_trait::async_trait;
use batch_pipeline::batcher::ConfigBuilder;
use batch_pipeline::pipeline::{
    Pipeline, Sink, SinkError, Source, SourceCatalog, SourceError, TracingReporter,
};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct LogEntry {
    instance_id: u64,
    message: String,
}

/// An event log with a fixed number of entries
struct EventLog {
    name: String,
    display_name: String,
    entries: u64,
}

impl Source<LogEntry> for EventLog {
    fn id(&self) -> &str {
        &self.name
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.entries as usize)
    }

    fn label(&self, _index: usize, item: &LogEntry) -> String {
        format!("{}:{}", self.display_name, item.instance_id)
    }

    fn enumerate(&self) -> BoxStream<'_, Result<LogEntry, SourceError>> {
        stream::iter(0..self.entries)
            .map(move |i| {
                Ok(LogEntry {
                    instance_id: 1000 + i,
                    message: format!("{} event {}", self.name, i),
                })
            })
            .boxed()
    }
}

/// Lists the machine's event logs
struct EventLogCatalog;

#[async_trait]
impl SourceCatalog<LogEntry> for EventLogCatalog {
    async fn discover(&self) -> Result<Vec<Box<dyn Source<LogEntry>>>, SourceError> {
        let logs = [
            ("Application", 4_200),
            ("Security", 2_750),
            ("Setup", 30),
            ("System", 9_000),
            ("Windows PowerShell", 1_100),
        ];
        let sources: Vec<Box<dyn Source<LogEntry>>> = logs
            .into_iter()
            .map(|(name, entries)| {
                Box::new(EventLog {
                    name: name.to_string(),
                    display_name: name.to_string(),
                    entries,
                }) as Box<dyn Source<LogEntry>>
            })
            .collect();
        Ok(sources)
    }
}

/// Stand-in for a bulk-indexing client
struct PrintingSink;

#[async_trait]
impl Sink<LogEntry> for PrintingSink {
    async fn deliver(&self, batch: Vec<LogEntry>) -> Result<bool, SinkError> {
        // Simulate the round trip to the index
        tokio::time::sleep(Duration::from_millis(20)).await;
        if let Some(first) = batch.first() {
            println!("indexed {} entries, first: {}", batch.len(), first.message);
        }
        Ok(true)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Arc::new(
        ConfigBuilder::default()
            .batch_size(1000usize)
            .capacity(5000usize)
            .build()?,
    );

    let summary = Pipeline::<LogEntry>::from_catalog(config, &EventLogCatalog, PrintingSink)
        .await?
        .excluding(&["System".to_string()])
        .with_reporter(Arc::new(TracingReporter::new()))
        .run()
        .await?;

    println!(
        "\nDone indexing: {} entries in {} batches ({} failed) from {} logs, {:?} in sink",
        summary.total_items,
        summary.total_batches,
        summary.failed_batches,
        summary.sources,
        summary.delivery_time,
    );
    Ok(())
}
