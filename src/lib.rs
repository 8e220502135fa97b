//! # batch-pipeline
//!
//! A bounded producer/consumer batching pipeline built on Tokio.
//!
//! ## Features
//!
//! - **Many concurrent sources** feeding one sink, one task per source
//! - **Fixed-size batches** with the trailing partial batch flushed on close
//! - **Backpressure** via an in-flight item bound covering delivery
//! - **Failure isolation** per source and per batch
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use batch_pipeline::batcher::ConfigBuilder;
//! use batch_pipeline::pipeline::{Pipeline, SinkError, VecSource};
//! use std::sync::Arc;
//!
//! let config = Arc::new(
//!     ConfigBuilder::default()
//!         .batch_size(100usize)
//!         .capacity(500usize)
//!         .build()?,
//! );
//!
//! let sink = |batch: Vec<u64>| async move {
//!     println!("indexing {} items", batch.len());
//!     Ok::<_, SinkError>(true)
//! };
//!
//! let summary = Pipeline::new(config, sink)
//!     .with_source(VecSource::new("app", (0..1_000).collect()))
//!     .run()
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`batcher`] - Bounded staging buffer grouping items into batches
//! - [`pipeline`] - Sources, sink, progress reporting and the run orchestration

pub mod batcher;
pub mod pipeline;
