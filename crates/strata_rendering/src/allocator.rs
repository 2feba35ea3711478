//! # Buffer-Pool Allocator
//!
//! Packs every chunk's geometry into a few large vertex/index buffer pairs
//! ("pools") instead of one buffer per chunk.
//!
//! ## Free lists
//!
//! Each pool keeps its holes in a free list sorted by vertex offset (ties
//! broken by index offset). Allocation is first-fit: the first hole with
//! enough room in BOTH vertex and index space is split and the remainder goes
//! back in sorted position. Freeing inserts the region and coalesces it with
//! its free-list neighbors, but only when they touch in vertex space AND in
//! index space. Merging on vertex adjacency alone would corrupt index-space
//! accounting.
//!
//! Because every allocation is carved from the front of a hole in both
//! spaces at once, the pool stays an ordered run of segments that are
//! contiguous in both spaces. Freeing everything always coalesces back to a
//! single hole spanning the pool.
//!
//! ## Growth
//!
//! When no pool has room, a new pool of the same size is created and the
//! request is retried once. A request bigger than an empty pool is a
//! configuration error.

use std::ops::Range;

use strata_meshing::ChunkVertex;
use strata_shared::Vec3;

use crate::error::{AllocError, AllocResult};

/// A region of one pool holding a chunk's mesh.
///
/// Only the allocator creates these. Valid iff both counts are nonzero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MeshAllocation {
    pool: usize,
    vertex_offset: u32,
    vertex_count: u32,
    index_offset: u32,
    index_count: u32,
}

impl MeshAllocation {
    /// The empty allocation. Drawing or freeing it does nothing.
    pub const INVALID: Self = Self {
        pool: 0,
        vertex_offset: 0,
        vertex_count: 0,
        index_offset: 0,
        index_count: 0,
    };

    /// Whether this allocation holds geometry.
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.vertex_count > 0 && self.index_count > 0
    }

    /// Pool the allocation lives in.
    #[inline]
    #[must_use]
    pub const fn pool_index(&self) -> usize {
        self.pool
    }

    /// First vertex (the draw call's base vertex).
    #[inline]
    #[must_use]
    pub const fn vertex_offset(&self) -> u32 {
        self.vertex_offset
    }

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub const fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// First index.
    #[inline]
    #[must_use]
    pub const fn index_offset(&self) -> u32 {
        self.index_offset
    }

    /// Number of indices.
    #[inline]
    #[must_use]
    pub const fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Vertex range inside the pool.
    #[must_use]
    pub const fn vertex_range(&self) -> Range<u32> {
        self.vertex_offset..self.vertex_offset + self.vertex_count
    }

    /// Index range inside the pool.
    #[must_use]
    pub const fn index_range(&self) -> Range<u32> {
        self.index_offset..self.index_offset + self.index_count
    }
}

/// One hole in a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBlock {
    /// First free vertex.
    pub vertex_offset: u32,
    /// First free index.
    pub index_offset: u32,
    /// Free vertices.
    pub vertex_capacity: u32,
    /// Free indices.
    pub index_capacity: u32,
}

impl BufferBlock {
    #[inline]
    const fn key(&self) -> (u32, u32) {
        (self.vertex_offset, self.index_offset)
    }

    /// Whether `next` starts exactly where `self` ends in both spaces.
    #[inline]
    #[must_use]
    pub const fn precedes(&self, next: &Self) -> bool {
        self.vertex_offset + self.vertex_capacity == next.vertex_offset
            && self.index_offset + self.index_capacity == next.index_offset
    }
}

/// Device-side storage for pools.
pub trait MeshBufferBackend {
    /// One vertex/index buffer pair.
    type Pool;

    /// Creates the buffers for pool number `index`.
    fn create_pool(&mut self, index: usize, vertex_capacity: u32, index_capacity: u32)
        -> Self::Pool;

    /// Writes mesh data into a freshly reserved region.
    fn upload(
        &mut self,
        pool: &mut Self::Pool,
        allocation: &MeshAllocation,
        vertices: &[ChunkVertex],
        indices: &[u32],
    );
}

/// A fixed-capacity buffer pair with its free list.
#[derive(Debug)]
pub struct BufferPool<P> {
    buffers: P,
    free: Vec<BufferBlock>,
}

impl<P> BufferPool<P> {
    fn new(buffers: P, vertex_capacity: u32, index_capacity: u32) -> Self {
        Self {
            buffers,
            free: vec![BufferBlock {
                vertex_offset: 0,
                index_offset: 0,
                vertex_capacity,
                index_capacity,
            }],
        }
    }

    /// Device buffers of this pool.
    #[must_use]
    pub const fn buffers(&self) -> &P {
        &self.buffers
    }

    /// Holes, sorted by vertex offset.
    #[must_use]
    pub fn free_blocks(&self) -> &[BufferBlock] {
        &self.free
    }

    /// First-fit reservation. Returns `(vertex_offset, index_offset)`.
    fn take(&mut self, vertices: u32, indices: u32) -> Option<(u32, u32)> {
        let slot = self
            .free
            .iter()
            .position(|b| b.vertex_capacity >= vertices && b.index_capacity >= indices)?;
        let block = self.free.remove(slot);

        let remainder = BufferBlock {
            vertex_offset: block.vertex_offset + vertices,
            index_offset: block.index_offset + indices,
            vertex_capacity: block.vertex_capacity - vertices,
            index_capacity: block.index_capacity - indices,
        };
        if remainder.vertex_capacity > 0 || remainder.index_capacity > 0 {
            let at = self.free.partition_point(|b| b.key() < remainder.key());
            self.free.insert(at, remainder);
        }
        Some((block.vertex_offset, block.index_offset))
    }

    /// Returns a region to the free list and coalesces it.
    fn release(&mut self, block: BufferBlock) {
        let mut at = self.free.partition_point(|b| b.key() < block.key());
        self.free.insert(at, block);

        if at + 1 < self.free.len() && self.free[at].precedes(&self.free[at + 1]) {
            let next = self.free.remove(at + 1);
            self.free[at].vertex_capacity += next.vertex_capacity;
            self.free[at].index_capacity += next.index_capacity;
        }
        if at > 0 && self.free[at - 1].precedes(&self.free[at]) {
            let current = self.free.remove(at);
            at -= 1;
            self.free[at].vertex_capacity += current.vertex_capacity;
            self.free[at].index_capacity += current.index_capacity;
        }
    }
}

/// Usage snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Pools created so far.
    pub pools: usize,
    /// Live allocations.
    pub allocations: usize,
    /// Vertices in live allocations.
    pub live_vertices: u64,
    /// Indices in live allocations.
    pub live_indices: u64,
    /// Holes across all pools.
    pub free_blocks: usize,
}

/// Grows-on-demand set of buffer pools.
pub struct BufferPoolAllocator<B: MeshBufferBackend> {
    backend: B,
    pools: Vec<BufferPool<B::Pool>>,
    vertex_capacity: u32,
    index_capacity: u32,
    max_pools: usize,
    live_allocations: usize,
    live_vertices: u64,
    live_indices: u64,
}

impl<B: MeshBufferBackend> BufferPoolAllocator<B> {
    /// Creates an allocator with its first pool.
    ///
    /// `max_pools` is clamped to at least one.
    pub fn new(mut backend: B, vertex_capacity: u32, index_capacity: u32, max_pools: usize) -> Self {
        let first = backend.create_pool(0, vertex_capacity, index_capacity);
        Self {
            backend,
            pools: vec![BufferPool::new(first, vertex_capacity, index_capacity)],
            vertex_capacity,
            index_capacity,
            max_pools: max_pools.max(1),
            live_allocations: 0,
            live_vertices: 0,
            live_indices: 0,
        }
    }

    /// Reserves space for a mesh and uploads it.
    ///
    /// An empty mesh yields [`MeshAllocation::INVALID`] without touching any
    /// pool.
    ///
    /// # Errors
    ///
    /// [`AllocError::RequestTooLarge`] if the mesh exceeds one whole pool,
    /// [`AllocError::Exhausted`] if every pool is full and no more may be
    /// created.
    pub fn allocate(&mut self, vertices: &[ChunkVertex], indices: &[u32]) -> AllocResult<MeshAllocation> {
        if vertices.is_empty() || indices.is_empty() {
            return Ok(MeshAllocation::INVALID);
        }
        let too_large = || AllocError::RequestTooLarge {
            vertices: vertices.len(),
            indices: indices.len(),
            vertex_capacity: self.vertex_capacity,
            index_capacity: self.index_capacity,
        };
        let vertex_count = u32::try_from(vertices.len()).map_err(|_| too_large())?;
        let index_count = u32::try_from(indices.len()).map_err(|_| too_large())?;
        if vertex_count > self.vertex_capacity || index_count > self.index_capacity {
            return Err(too_large());
        }

        let found = self
            .pools
            .iter_mut()
            .enumerate()
            .find_map(|(i, pool)| pool.take(vertex_count, index_count).map(|at| (i, at)));

        let (pool_index, (vertex_offset, index_offset)) = match found {
            Some(hit) => hit,
            None => {
                if self.pools.len() >= self.max_pools {
                    return Err(AllocError::Exhausted {
                        pools: self.pools.len(),
                    });
                }
                let index = self.pools.len();
                let buffers = self
                    .backend
                    .create_pool(index, self.vertex_capacity, self.index_capacity);
                self.pools
                    .push(BufferPool::new(buffers, self.vertex_capacity, self.index_capacity));
                tracing::info!(
                    "buffer pool {} created ({} vertices / {} indices)",
                    index,
                    self.vertex_capacity,
                    self.index_capacity
                );
                let at = self.pools[index]
                    .take(vertex_count, index_count)
                    .ok_or(AllocError::Exhausted { pools: index + 1 })?;
                (index, at)
            }
        };

        let allocation = MeshAllocation {
            pool: pool_index,
            vertex_offset,
            vertex_count,
            index_offset,
            index_count,
        };
        let pool = &mut self.pools[pool_index];
        self.backend
            .upload(&mut pool.buffers, &allocation, vertices, indices);

        self.live_allocations += 1;
        self.live_vertices += u64::from(vertex_count);
        self.live_indices += u64::from(index_count);
        Ok(allocation)
    }

    /// Returns an allocation's space to its pool.
    ///
    /// Freeing the invalid allocation is a no-op.
    pub fn free(&mut self, allocation: MeshAllocation) {
        if !allocation.is_valid() {
            return;
        }
        let Some(pool) = self.pools.get_mut(allocation.pool_index()) else {
            tracing::warn!("free of allocation in unknown pool {}", allocation.pool);
            return;
        };
        pool.release(BufferBlock {
            vertex_offset: allocation.vertex_offset,
            index_offset: allocation.index_offset,
            vertex_capacity: allocation.vertex_count,
            index_capacity: allocation.index_count,
        });
        self.live_allocations = self.live_allocations.saturating_sub(1);
        self.live_vertices = self
            .live_vertices
            .saturating_sub(u64::from(allocation.vertex_count));
        self.live_indices = self
            .live_indices
            .saturating_sub(u64::from(allocation.index_count));
    }

    /// Starts a draw session that skips redundant pool binds.
    pub fn begin_draw<'p, 't, T>(&'p self, target: &'t mut T) -> DrawSession<'p, 't, B, T>
    where
        T: DrawTarget<'p, B::Pool>,
    {
        DrawSession {
            allocator: self,
            target,
            bound: None,
            binds: 0,
            draws: 0,
        }
    }

    /// Number of pools.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// A pool by index.
    #[must_use]
    pub fn pool(&self, index: usize) -> Option<&BufferPool<B::Pool>> {
        self.pools.get(index)
    }

    /// Vertices per pool.
    #[must_use]
    pub const fn vertex_capacity(&self) -> u32 {
        self.vertex_capacity
    }

    /// Indices per pool.
    #[must_use]
    pub const fn index_capacity(&self) -> u32 {
        self.index_capacity
    }

    /// Device backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Usage snapshot.
    #[must_use]
    pub fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            pools: self.pools.len(),
            allocations: self.live_allocations,
            live_vertices: self.live_vertices,
            live_indices: self.live_indices,
            free_blocks: self.pools.iter().map(|p| p.free.len()).sum(),
        }
    }
}

/// Something that can bind a pool and issue indexed draws from it.
///
/// Implemented by `wgpu::RenderPass` and by test recorders. `'p` is how long
/// the bound pool must stay borrowed.
pub trait DrawTarget<'p, P> {
    /// Binds a pool's vertex and index buffers.
    fn bind_pool(&mut self, pool_index: usize, pool: &'p P);

    /// Draws one allocation from the bound pool at a world anchor.
    fn draw_indexed(&mut self, allocation: &MeshAllocation, anchor: Vec3);
}

/// Draws allocations while caching the last-bound pool.
///
/// Sort by pool index before drawing to get the benefit.
pub struct DrawSession<'p, 't, B: MeshBufferBackend, T> {
    allocator: &'p BufferPoolAllocator<B>,
    target: &'t mut T,
    bound: Option<usize>,
    binds: u32,
    draws: u32,
}

impl<'p, 't, B, T> DrawSession<'p, 't, B, T>
where
    B: MeshBufferBackend,
    T: DrawTarget<'p, B::Pool>,
{
    /// Draws an allocation. Invalid allocations are skipped.
    pub fn draw(&mut self, allocation: &MeshAllocation, anchor: Vec3) {
        if !allocation.is_valid() {
            return;
        }
        let index = allocation.pool_index();
        if self.bound != Some(index) {
            let allocator: &'p BufferPoolAllocator<B> = self.allocator;
            let Some(pool) = allocator.pools.get(index) else {
                return;
            };
            self.target.bind_pool(index, &pool.buffers);
            self.bound = Some(index);
            self.binds += 1;
        }
        self.target.draw_indexed(allocation, anchor);
        self.draws += 1;
    }

    /// Pool binds issued so far.
    #[must_use]
    pub const fn binds(&self) -> u32 {
        self.binds
    }

    /// Draw calls issued so far.
    #[must_use]
    pub const fn draws(&self) -> u32 {
        self.draws
    }
}
