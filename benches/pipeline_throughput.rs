use batch_pipeline::batcher::ConfigBuilder;
use batch_pipeline::pipeline::{Pipeline, SinkError, VecSource};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct MockEntry {
    id: u64,
    source: String,
    payload: Vec<u8>,
}

fn generate_entries(source: &str, count: usize) -> Vec<MockEntry> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| MockEntry {
            id: i as u64,
            source: source.to_string(),
            payload: (0..rng.gen_range(64..256)).map(|_| rng.gen()).collect(),
        })
        .collect()
}

fn build_pipeline(
    batch_size: usize,
    capacity: usize,
    sources: usize,
    per_source: usize,
    sink_latency: Duration,
) -> Pipeline<MockEntry> {
    let config = Arc::new(
        ConfigBuilder::default()
            .batch_size(batch_size)
            .capacity(capacity)
            .build()
            .unwrap(),
    );

    let sink = move |batch: Vec<MockEntry>| async move {
        let bytes: usize = batch.iter().map(|e| e.payload.len() + e.source.len()).sum();
        std::hint::black_box((bytes, batch.last().map(|e| e.id)));
        if !sink_latency.is_zero() {
            tokio::time::sleep(sink_latency).await;
        }
        Ok::<_, SinkError>(true)
    };

    let mut pipeline = Pipeline::new(config, sink);
    for s in 0..sources {
        let id = format!("log_{s}");
        let entries = generate_entries(&id, per_source);
        pipeline = pipeline.with_source(VecSource::new(id, entries));
    }
    pipeline
}

fn bench_batch_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_batch_sizes");
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let total = 4 * 2_500;
    for batch_size in [10usize, 100, 500, 1000] {
        group.throughput(Throughput::Elements(total as u64));
        group.bench_with_input(
            BenchmarkId::new("batch_size", batch_size),
            &batch_size,
            |b, &batch_size| {
                b.to_async(&runtime).iter(|| async move {
                    let pipeline =
                        build_pipeline(batch_size, batch_size * 5, 4, 2_500, Duration::ZERO);
                    pipeline.run().await.unwrap();
                });
            },
        );
    }
    group.finish();
}

fn bench_source_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_source_counts");
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let per_source = 1_000;
    for sources in [1usize, 4, 16, 64] {
        group.throughput(Throughput::Elements((sources * per_source) as u64));
        group.bench_with_input(BenchmarkId::new("sources", sources), &sources, |b, &sources| {
            b.to_async(&runtime).iter(|| async move {
                let pipeline = build_pipeline(100, 500, sources, per_source, Duration::ZERO);
                pipeline.run().await.unwrap();
            });
        });
    }
    group.finish();
}

fn bench_capacity_with_slow_sink(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_capacity_slow_sink");
    group.sample_size(10);
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let total = 8 * 500;
    for capacity in [100usize, 400, 1600] {
        group.throughput(Throughput::Elements(total as u64));
        group.bench_with_input(
            BenchmarkId::new("capacity", capacity),
            &capacity,
            |b, &capacity| {
                b.to_async(&runtime).iter(|| async move {
                    let pipeline =
                        build_pipeline(100, capacity, 8, 500, Duration::from_micros(500));
                    pipeline.run().await.unwrap();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_batch_sizes,
    bench_source_counts,
    bench_capacity_with_slow_sink
);
criterion_main!(benches);
