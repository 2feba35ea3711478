//! Benchmark for work queue hand-off.
//!
//! TARGET: a full frame of mesh results (4096) drained in under 100us
//!
//! Run with: cargo bench --package strata_core --bench queue_benchmark

use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use strata_core::WorkQueue;
use strata_shared::ChunkCoord;

fn benchmark_try_push_drain(c: &mut Criterion) {
    let queue = WorkQueue::bounded(4096);

    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(4096));
    group.bench_function("try_push_drain_4096", |b| {
        b.iter(|| {
            for i in 0..4096 {
                let _ = queue.try_push(ChunkCoord::new(i, 0, -i));
            }
            black_box(queue.drain().count())
        });
    });
    group.finish();
}

fn benchmark_cross_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_cross_thread");
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("spsc_10k", |b| {
        b.iter(|| {
            let queue: Arc<WorkQueue<u64>> = Arc::new(WorkQueue::bounded(256));
            let consumer = {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut sum = 0u64;
                    while let Some(v) = queue.pop_blocking() {
                        sum += v;
                    }
                    sum
                })
            };
            for i in 0..10_000u64 {
                let _ = queue.push(i);
            }
            queue.shutdown();
            black_box(consumer.join().ok())
        });
    });
    group.finish();
}

criterion_group!(benches, benchmark_try_push_drain, benchmark_cross_thread);
criterion_main!(benches);
