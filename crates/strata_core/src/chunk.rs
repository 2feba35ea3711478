//! Immutable chunk storage.
//!
//! A [`Chunk`] is built exactly once from a completed terrain read-back and
//! never written again, so meshing workers can read it through an `Arc`
//! without any per-chunk locking.

use std::sync::atomic::{AtomicU64, Ordering};

use strata_shared::coords::local_index;
use strata_shared::{BlockType, ChunkCoord, CHUNK_DIM, CHUNK_VOLUME};

/// Process-unique identity of one chunk incarnation.
///
/// A coordinate that is unloaded and later regenerated gets a new id, which
/// lets the main thread recognize mesh results produced for the old data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(u64);

impl ChunkId {
    /// Allocates the next id.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value, for logging.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// A `CHUNK_DIM³` block of terrain.
///
/// Blocks are stored X fastest, then Y, then Z (see
/// [`local_index`]).
pub struct Chunk {
    id: ChunkId,
    coord: ChunkCoord,
    /// Always exactly `CHUNK_VOLUME` entries.
    blocks: Box<[BlockType]>,
    /// Number of non-air blocks.
    solid_count: u32,
}

impl Chunk {
    /// Builds a chunk from raw block data.
    ///
    /// Short input is padded with air and long input is truncated, so a
    /// malformed read-back can never produce an out-of-bounds chunk.
    #[must_use]
    pub fn from_blocks(coord: ChunkCoord, mut blocks: Vec<BlockType>) -> Self {
        blocks.resize(CHUNK_VOLUME, BlockType::AIR);
        let solid_count = blocks.iter().filter(|b| !b.is_air()).count();
        let solid_count = u32::try_from(solid_count).unwrap_or(u32::MAX);
        Self {
            id: ChunkId::next(),
            coord,
            blocks: blocks.into_boxed_slice(),
            solid_count,
        }
    }

    /// A chunk with every block set to `block`.
    #[must_use]
    pub fn filled(coord: ChunkCoord, block: BlockType) -> Self {
        Self::from_blocks(coord, vec![block; CHUNK_VOLUME])
    }

    /// A chunk built by evaluating `f(x, y, z)` at every local position.
    #[must_use]
    pub fn from_fn(coord: ChunkCoord, mut f: impl FnMut(usize, usize, usize) -> BlockType) -> Self {
        let mut blocks = Vec::with_capacity(CHUNK_VOLUME);
        for z in 0..CHUNK_DIM {
            for y in 0..CHUNK_DIM {
                for x in 0..CHUNK_DIM {
                    blocks.push(f(x, y, z));
                }
            }
        }
        Self::from_blocks(coord, blocks)
    }

    /// Identity of this chunk incarnation.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ChunkId {
        self.id
    }

    /// Grid cell of this chunk.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Block at a local position.
    ///
    /// # Panics
    ///
    /// Panics if any component is `>= CHUNK_DIM`.
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize, z: usize) -> BlockType {
        debug_assert!(x < CHUNK_DIM && y < CHUNK_DIM && z < CHUNK_DIM);
        self.blocks[local_index(x, y, z)]
    }

    /// Raw block data in storage order.
    #[inline]
    #[must_use]
    pub fn blocks(&self) -> &[BlockType] {
        &self.blocks
    }

    /// Number of non-air blocks.
    #[inline]
    #[must_use]
    pub const fn solid_count(&self) -> u32 {
        self.solid_count
    }

    /// Returns true if every block is air.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.solid_count == 0
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("id", &self.id)
            .field("coord", &self.coord)
            .field("solid_count", &self.solid_count)
            .finish_non_exhaustive()
    }
}
