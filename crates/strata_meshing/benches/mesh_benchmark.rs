//! Benchmark for greedy meshing.
//!
//! TARGET: a terrain surface chunk in under 200us per worker
//!
//! Run with: cargo bench --package strata_meshing --bench mesh_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use strata_core::Chunk;
use strata_meshing::{ChunkMesh, EmptyWorld, GreedyMesher};
use strata_procedural::{TerrainGenerator, TerrainParams};
use strata_shared::{BlockRegistry, BlockType, ChunkCoord};

fn benchmark_terrain_chunk(c: &mut Criterion) {
    let registry = BlockRegistry::builtin();
    let gen = TerrainGenerator::new(TerrainParams::with_seed(42));
    let coord = ChunkCoord::new(0, 0, 0);
    let chunk = Chunk::from_blocks(coord, gen.generate(coord));
    let mut mesher = GreedyMesher::new();
    let mut out = ChunkMesh::default();

    c.bench_function("mesh_terrain_chunk", |b| {
        b.iter(|| {
            mesher.mesh_into(&chunk, &registry, &EmptyWorld, &mut out);
            black_box(out.quad_count())
        });
    });
}

fn benchmark_worst_case(c: &mut Criterion) {
    let registry = BlockRegistry::builtin();
    // 3D checkerboard defeats every merge
    let chunk = Chunk::from_fn(ChunkCoord::ORIGIN, |x, y, z| {
        if (x + y + z) % 2 == 0 {
            BlockType::STONE
        } else {
            BlockType::AIR
        }
    });
    let mut mesher = GreedyMesher::new();
    let mut out = ChunkMesh::default();

    let mut group = c.benchmark_group("mesh_worst_case");
    group.throughput(Throughput::Elements(1));
    group.sample_size(20);
    group.bench_function("checkerboard", |b| {
        b.iter(|| {
            mesher.mesh_into(&chunk, &registry, &EmptyWorld, &mut out);
            black_box(out.quad_count())
        });
    });
    group.finish();
}

criterion_group!(benches, benchmark_terrain_chunk, benchmark_worst_case);
criterion_main!(benches);
