//! # Headless Backends
//!
//! Host-memory stand-ins for the device. Terrain comes from the same
//! generator the compute shader mirrors, and fences signal after a fixed
//! number of [`TerrainBackend::poll`] calls so tests see the real
//! multi-frame latency of the pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use strata_meshing::ChunkVertex;
use strata_procedural::TerrainGenerator;
use strata_shared::{BlockType, ChunkCoord, Vec3, CHUNK_VOLUME};

use crate::allocator::{DrawTarget, MeshAllocation, MeshBufferBackend};
use crate::error::GpuError;
use crate::fence::Fence;
use crate::jobs::TerrainBackend;

/// Fence that signals once a shared frame clock reaches a target tick.
#[derive(Debug, Clone)]
pub struct CpuFence {
    ready_at: u64,
    clock: Arc<AtomicU64>,
}

impl Fence for CpuFence {
    fn is_signaled(&self) -> bool {
        self.clock.load(Ordering::Acquire) >= self.ready_at
    }
}

/// Terrain generation on the host with simulated device latency.
pub struct CpuTerrainBackend {
    generator: TerrainGenerator,
    latency: u32,
    clock: Arc<AtomicU64>,
    storage: Vec<Vec<BlockType>>,
    transfer: Vec<Vec<BlockType>>,
    transfer_ready_at: Vec<u64>,
    failing_reads: u32,
    dispatches: u64,
}

impl CpuTerrainBackend {
    /// Creates a backend whose fences signal `latency` polls after submission.
    #[must_use]
    pub fn new(generator: TerrainGenerator, latency: u32) -> Self {
        Self {
            generator,
            latency,
            clock: Arc::new(AtomicU64::new(0)),
            storage: Vec::new(),
            transfer: Vec::new(),
            transfer_ready_at: Vec::new(),
            failing_reads: 0,
            dispatches: 0,
        }
    }

    /// Makes the next `count` reads fail as if mapping failed.
    pub fn fail_next_reads(&mut self, count: u32) {
        self.failing_reads = count;
    }

    /// Total generation dispatches so far.
    #[must_use]
    pub const fn dispatch_count(&self) -> u64 {
        self.dispatches
    }

    fn fence(&self) -> CpuFence {
        CpuFence {
            ready_at: self.clock.load(Ordering::Acquire) + u64::from(self.latency),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl TerrainBackend for CpuTerrainBackend {
    type Fence = CpuFence;

    fn create_slots(&mut self, storage: usize, transfer: usize) {
        self.storage = vec![vec![BlockType::AIR; CHUNK_VOLUME]; storage];
        self.transfer = vec![vec![BlockType::AIR; CHUNK_VOLUME]; transfer];
        self.transfer_ready_at = vec![0; transfer];
    }

    fn dispatch(&mut self, storage_slot: usize, coord: ChunkCoord) -> CpuFence {
        self.generator.fill(coord, &mut self.storage[storage_slot]);
        self.dispatches += 1;
        self.fence()
    }

    fn copy_to_transfer(&mut self, storage_slot: usize, transfer_slot: usize) -> CpuFence {
        let (storage, transfer) = (&self.storage[storage_slot], &mut self.transfer[transfer_slot]);
        transfer.copy_from_slice(storage);
        let fence = self.fence();
        self.transfer_ready_at[transfer_slot] = fence.ready_at;
        fence
    }

    fn read_transfer(&mut self, transfer_slot: usize, out: &mut [BlockType]) -> Result<(), GpuError> {
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(GpuError::MapFailed { slot: transfer_slot });
        }
        if self.clock.load(Ordering::Acquire) < self.transfer_ready_at[transfer_slot] {
            return Err(GpuError::NotReady { slot: transfer_slot });
        }
        let src = &self.transfer[transfer_slot];
        let n = out.len().min(src.len());
        out[..n].copy_from_slice(&src[..n]);
        Ok(())
    }

    fn poll(&mut self) {
        self.clock.fetch_add(1, Ordering::AcqRel);
    }
}

/// One pool's vertex and index storage in host memory.
#[derive(Debug, Clone, Default)]
pub struct CpuMeshPool {
    vertices: Vec<ChunkVertex>,
    indices: Vec<u32>,
}

impl CpuMeshPool {
    /// Vertices of an allocation.
    #[must_use]
    pub fn vertices(&self, allocation: &MeshAllocation) -> &[ChunkVertex] {
        let r = allocation.vertex_range();
        &self.vertices[r.start as usize..r.end as usize]
    }

    /// Indices of an allocation.
    #[must_use]
    pub fn indices(&self, allocation: &MeshAllocation) -> &[u32] {
        let r = allocation.index_range();
        &self.indices[r.start as usize..r.end as usize]
    }
}

/// Host-memory buffer pools.
#[derive(Debug, Default)]
pub struct CpuMeshBackend {
    uploads: u64,
}

impl CpuMeshBackend {
    /// Creates the backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of uploads performed.
    #[must_use]
    pub const fn upload_count(&self) -> u64 {
        self.uploads
    }
}

impl MeshBufferBackend for CpuMeshBackend {
    type Pool = CpuMeshPool;

    fn create_pool(&mut self, _index: usize, vertex_capacity: u32, index_capacity: u32) -> CpuMeshPool {
        CpuMeshPool {
            vertices: vec![ChunkVertex::default(); vertex_capacity as usize],
            indices: vec![0; index_capacity as usize],
        }
    }

    fn upload(
        &mut self,
        pool: &mut CpuMeshPool,
        allocation: &MeshAllocation,
        vertices: &[ChunkVertex],
        indices: &[u32],
    ) {
        let v = allocation.vertex_offset() as usize;
        let i = allocation.index_offset() as usize;
        pool.vertices[v..v + vertices.len()].copy_from_slice(vertices);
        pool.indices[i..i + indices.len()].copy_from_slice(indices);
        self.uploads += 1;
    }
}

/// A draw call captured by [`RecordingTarget`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedDraw {
    /// Pool bound at the time of the draw.
    pub pool: Option<usize>,
    /// Allocation drawn.
    pub allocation: MeshAllocation,
    /// World anchor passed with the draw.
    pub anchor: Vec3,
}

/// Draw target that records instead of rendering.
#[derive(Debug, Default)]
pub struct RecordingTarget {
    /// Pool indices in bind order.
    pub binds: Vec<usize>,
    /// Draws in submission order.
    pub draws: Vec<RecordedDraw>,
    bound: Option<usize>,
}

impl<'p> DrawTarget<'p, CpuMeshPool> for RecordingTarget {
    fn bind_pool(&mut self, pool_index: usize, _pool: &'p CpuMeshPool) {
        self.binds.push(pool_index);
        self.bound = Some(pool_index);
    }

    fn draw_indexed(&mut self, allocation: &MeshAllocation, anchor: Vec3) {
        self.draws.push(RecordedDraw {
            pool: self.bound,
            allocation: *allocation,
            anchor,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_procedural::TerrainParams;

    #[test]
    fn test_read_before_fence_is_rejected() {
        let generator = TerrainGenerator::new(TerrainParams::default());
        let mut backend = CpuTerrainBackend::new(generator, 3);
        backend.create_slots(1, 1);
        let _ = backend.dispatch(0, ChunkCoord::ORIGIN);
        let fence = backend.copy_to_transfer(0, 0);
        let mut out = vec![BlockType::AIR; CHUNK_VOLUME];
        assert!(matches!(
            backend.read_transfer(0, &mut out),
            Err(GpuError::NotReady { slot: 0 })
        ));
        for _ in 0..3 {
            backend.poll();
        }
        assert!(fence.is_signaled());
        assert!(backend.read_transfer(0, &mut out).is_ok());
    }
}
