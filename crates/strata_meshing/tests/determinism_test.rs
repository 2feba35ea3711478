//! Meshing determinism over generated terrain.
//!
//! Meshing identical chunk contents against identical neighbor data must
//! produce byte-identical vertex and index buffers.

use std::sync::Arc;

use strata_core::Chunk;
use strata_meshing::{mesh_chunk, GreedyMesher, NeighborSnapshot};
use strata_procedural::{TerrainGenerator, TerrainParams};
use strata_shared::{BlockRegistry, ChunkCoord};

fn snapshot(gen: &TerrainGenerator, center: ChunkCoord) -> NeighborSnapshot {
    NeighborSnapshot::capture(center, |coord| {
        Some(Arc::new(Chunk::from_blocks(coord, gen.generate(coord))))
    })
}

#[test]
fn test_terrain_mesh_is_byte_identical() {
    let registry = BlockRegistry::builtin();
    let gen = TerrainGenerator::new(TerrainParams::with_seed(2024));

    for center in [
        ChunkCoord::new(0, 0, 0),
        ChunkCoord::new(-3, 0, 5),
        ChunkCoord::new(7, 1, -2),
    ] {
        let first = Chunk::from_blocks(center, gen.generate(center));
        let second = Chunk::from_blocks(center, gen.generate(center));
        let neighbors = snapshot(&gen, center);
        assert_eq!(neighbors.len(), 6);

        let a = mesh_chunk(&first, &registry, &neighbors);
        let b = GreedyMesher::new().mesh(&second, &registry, &neighbors);

        assert_eq!(a.opaque.vertex_bytes(), b.opaque.vertex_bytes());
        assert_eq!(a.opaque.index_bytes(), b.opaque.index_bytes());
        assert_eq!(a.transparent.vertex_bytes(), b.transparent.vertex_bytes());
        assert_eq!(a.transparent.index_bytes(), b.transparent.index_bytes());
    }
}
