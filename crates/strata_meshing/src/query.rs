//! Block lookups outside the chunk being meshed.

use std::sync::Arc;

use strata_core::Chunk;
use strata_shared::{BlockPos, BlockType, ChunkCoord};

/// Read-only view of the world used for faces on chunk borders.
///
/// Positions not backed by loaded data must read as air.
pub trait WorldQuery {
    /// Block at a world position.
    fn block_at(&self, pos: BlockPos) -> BlockType;
}

impl<F> WorldQuery for F
where
    F: Fn(BlockPos) -> BlockType,
{
    fn block_at(&self, pos: BlockPos) -> BlockType {
        self(pos)
    }
}

/// A world with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyWorld;

impl WorldQuery for EmptyWorld {
    fn block_at(&self, _pos: BlockPos) -> BlockType {
        BlockType::AIR
    }
}

/// The face neighbors of one chunk, captured under the table lock.
///
/// Holds `Arc` clones only, so taking the snapshot is cheap and meshing runs
/// without holding any lock.
#[derive(Debug, Default, Clone)]
pub struct NeighborSnapshot {
    chunks: Vec<Arc<Chunk>>,
}

impl NeighborSnapshot {
    /// Captures the face neighbors of `center` through `lookup`.
    pub fn capture(center: ChunkCoord, lookup: impl FnMut(ChunkCoord) -> Option<Arc<Chunk>>) -> Self {
        Self {
            chunks: center.face_neighbors().into_iter().filter_map(lookup).collect(),
        }
    }

    /// Number of neighbors present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if no neighbor was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl WorldQuery for NeighborSnapshot {
    fn block_at(&self, pos: BlockPos) -> BlockType {
        let coord = pos.chunk();
        self.chunks
            .iter()
            .find(|chunk| chunk.coord() == coord)
            .map_or(BlockType::AIR, |chunk| {
                let [x, y, z] = pos.local();
                chunk.get(x, y, z)
            })
    }
}
