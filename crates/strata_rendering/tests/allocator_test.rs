//! Randomized allocate/free workload against the buffer-pool allocator.
//!
//! Checks that live allocations never overlap, that uploaded data stays
//! intact while neighbors come and go, and that freeing everything coalesces
//! each pool back into one hole.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_meshing::ChunkVertex;
use strata_rendering::{BufferBlock, BufferPoolAllocator, CpuMeshBackend, MeshAllocation};

const VERTEX_CAPACITY: u32 = 4096;
const INDEX_CAPACITY: u32 = 6144;

fn mesh(quads: usize, tag: u32) -> (Vec<ChunkVertex>, Vec<u32>) {
    let vertices = (0..quads * 4)
        .map(|i| ChunkVertex {
            position: [i as f32, 0.0, 0.0],
            texture_layer: tag,
            ..ChunkVertex::default()
        })
        .collect();
    let indices = (0..quads as u32)
        .flat_map(|q| {
            let b = q * 4;
            [b, b + 1, b + 2, b, b + 2, b + 3]
        })
        .map(|i| i ^ (tag << 16))
        .collect();
    (vertices, indices)
}

fn overlaps(a: &MeshAllocation, b: &MeshAllocation) -> bool {
    if a.pool_index() != b.pool_index() {
        return false;
    }
    let (va, vb) = (a.vertex_range(), b.vertex_range());
    let (ia, ib) = (a.index_range(), b.index_range());
    (va.start < vb.end && vb.start < va.end) || (ia.start < ib.end && ib.start < ia.end)
}

#[test]
fn test_random_workload_keeps_data_and_coalesces() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x57A7A);
    let mut allocator =
        BufferPoolAllocator::new(CpuMeshBackend::new(), VERTEX_CAPACITY, INDEX_CAPACITY, 64);
    let mut live: Vec<(MeshAllocation, u32, usize)> = Vec::new();
    let mut next_tag = 1u32;

    for _ in 0..2000 {
        if live.is_empty() || rng.gen_bool(0.6) {
            let quads = rng.gen_range(1..=64);
            let (v, i) = mesh(quads, next_tag);
            let allocation = allocator.allocate(&v, &i).unwrap();
            assert!(allocation.is_valid());
            for (other, _, _) in &live {
                assert!(!overlaps(&allocation, other), "{allocation:?} overlaps {other:?}");
            }
            live.push((allocation, next_tag, quads));
            next_tag += 1;
        } else {
            let victim = rng.gen_range(0..live.len());
            let (allocation, _, _) = live.swap_remove(victim);
            allocator.free(allocation);
        }
    }

    for (allocation, tag, quads) in &live {
        let (v, i) = mesh(*quads, *tag);
        let pool = allocator.pool(allocation.pool_index()).unwrap().buffers();
        assert_eq!(pool.vertices(allocation), v.as_slice());
        assert_eq!(pool.indices(allocation), i.as_slice());
    }
    assert_eq!(allocator.stats().allocations, live.len());

    for (allocation, _, _) in live.drain(..) {
        allocator.free(allocation);
    }
    let stats = allocator.stats();
    assert_eq!(stats.allocations, 0);
    assert_eq!(stats.live_vertices, 0);
    assert_eq!(stats.live_indices, 0);
    for index in 0..allocator.pool_count() {
        assert_eq!(
            allocator.pool(index).unwrap().free_blocks(),
            &[BufferBlock {
                vertex_offset: 0,
                index_offset: 0,
                vertex_capacity: VERTEX_CAPACITY,
                index_capacity: INDEX_CAPACITY,
            }]
        );
    }
}

#[test]
fn test_fill_then_free_in_reverse_order() {
    let mut allocator = BufferPoolAllocator::new(CpuMeshBackend::new(), 256, 384, 4);
    let (v, i) = mesh(8, 1);
    let allocations: Vec<_> = (0..32).map(|_| allocator.allocate(&v, &i).unwrap()).collect();
    assert_eq!(allocator.pool_count(), 4);
    assert!(allocator.allocate(&v, &i).is_err());

    for allocation in allocations.into_iter().rev() {
        allocator.free(allocation);
    }
    for index in 0..4 {
        assert_eq!(allocator.pool(index).unwrap().free_blocks().len(), 1);
    }
}
