//! Benchmark for buffer-pool allocation churn.
//!
//! TARGET: allocate + free of a typical chunk mesh in under 2us
//!
//! Run with: cargo bench --package strata_rendering --bench allocator_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_meshing::ChunkVertex;
use strata_rendering::{BufferPoolAllocator, CpuMeshBackend, MeshAllocation};

fn benchmark_churn(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut allocator = BufferPoolAllocator::new(CpuMeshBackend::new(), 1 << 20, 3 << 19, 8);
    let vertices = vec![ChunkVertex::default(); 1200];
    let indices = vec![0u32; 1800];

    // Fragment the pool first
    let mut live: Vec<MeshAllocation> = (0..512)
        .map(|_| {
            let n = rng.gen_range(1..300) * 4;
            allocator
                .allocate(&vertices[..n], &indices[..n / 4 * 6])
                .unwrap_or_default()
        })
        .collect();
    for i in (0..live.len()).step_by(2) {
        allocator.free(std::mem::take(&mut live[i]));
    }

    c.bench_function("allocate_free_chunk_mesh", |b| {
        b.iter(|| {
            let allocation = allocator.allocate(&vertices, &indices).unwrap_or_default();
            allocator.free(black_box(allocation));
        });
    });
}

criterion_group!(benches, benchmark_churn);
criterion_main!(benches);
