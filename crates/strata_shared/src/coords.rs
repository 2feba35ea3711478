//! Chunk and block coordinates.
//!
//! Blocks are addressed by integer world positions. Chunks are the
//! `CHUNK_DIM³` cells of the grid those positions fall into. Conversions use
//! Euclidean division so that `-1` lands in chunk `-1`, not chunk `0`.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::constants::{CHUNK_DIM, CHUNK_DIM_I32};
use crate::math::{Aabb, Vec3};

/// Linear index of a block inside a chunk.
///
/// Layout is X fastest, then Y, then Z. The compute shader writes blocks in
/// the same order.
#[inline]
#[must_use]
pub const fn local_index(x: usize, y: usize, z: usize) -> usize {
    (z * CHUNK_DIM + y) * CHUNK_DIM + x
}

/// Chunk coordinate on the chunk grid.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable, Serialize,
    Deserialize,
)]
pub struct ChunkCoord {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl ChunkCoord {
    /// The chunk containing the world origin.
    pub const ORIGIN: Self = Self::new(0, 0, 0);

    /// Face-neighbor offsets in sweep order: +X, -X, +Y, -Y, +Z, -Z.
    pub const FACE_OFFSETS: [[i32; 3]; 6] = [
        [1, 0, 0],
        [-1, 0, 0],
        [0, 1, 0],
        [0, -1, 0],
        [0, 0, 1],
        [0, 0, -1],
    ];

    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Converts a block position to the chunk that owns it.
    #[inline]
    #[must_use]
    pub const fn from_block(pos: BlockPos) -> Self {
        Self::new(
            pos.x.div_euclid(CHUNK_DIM_I32),
            pos.y.div_euclid(CHUNK_DIM_I32),
            pos.z.div_euclid(CHUNK_DIM_I32),
        )
    }

    /// Converts a world-space position to the chunk containing it.
    #[must_use]
    pub fn from_world_position(position: Vec3, block_size: f32) -> Self {
        Self::from_block(BlockPos::from_world_position(position, block_size))
    }

    /// Returns this coordinate shifted by the given chunk offsets.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Squared distance in chunk units.
    #[inline]
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        let dz = self.z as i64 - other.z as i64;
        dx * dx + dy * dy + dz * dz
    }

    /// The six face-adjacent chunks, ordered like [`Self::FACE_OFFSETS`].
    #[must_use]
    pub fn face_neighbors(self) -> [Self; 6] {
        Self::FACE_OFFSETS.map(|[dx, dy, dz]| self.offset(dx, dy, dz))
    }

    /// Block position of this chunk's minimum corner.
    #[inline]
    #[must_use]
    pub const fn origin_block(self) -> BlockPos {
        BlockPos::new(
            self.x * CHUNK_DIM_I32,
            self.y * CHUNK_DIM_I32,
            self.z * CHUNK_DIM_I32,
        )
    }

    /// World-space anchor (minimum corner) of this chunk.
    #[must_use]
    pub fn world_anchor(self, block_size: f32) -> Vec3 {
        let edge = CHUNK_DIM as f32 * block_size;
        Vec3::new(
            self.x as f32 * edge,
            self.y as f32 * edge,
            self.z as f32 * edge,
        )
    }

    /// World-space bounding box of this chunk.
    #[must_use]
    pub fn world_bounds(self, block_size: f32) -> Aabb {
        let min = self.world_anchor(block_size);
        let edge = CHUNK_DIM as f32 * block_size;
        Aabb::new(min, min + Vec3::splat(edge))
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{},{}]", self.x, self.y, self.z)
    }
}

/// Integer world-space block position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BlockPos {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl BlockPos {
    /// Creates a new block position.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Block containing a world-space position.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_world_position(position: Vec3, block_size: f32) -> Self {
        Self::new(
            (position.x / block_size).floor() as i32,
            (position.y / block_size).floor() as i32,
            (position.z / block_size).floor() as i32,
        )
    }

    /// Returns this position shifted by the given block offsets.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Chunk that owns this block.
    #[inline]
    #[must_use]
    pub const fn chunk(self) -> ChunkCoord {
        ChunkCoord::from_block(self)
    }

    /// Position inside the owning chunk, each component in `0..CHUNK_DIM`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn local(self) -> [usize; 3] {
        [
            self.x.rem_euclid(CHUNK_DIM_I32) as usize,
            self.y.rem_euclid(CHUNK_DIM_I32) as usize,
            self.z.rem_euclid(CHUNK_DIM_I32) as usize,
        ]
    }

    /// Linear index inside the owning chunk.
    #[inline]
    #[must_use]
    pub const fn local_index(self) -> usize {
        let [x, y, z] = self.local();
        local_index(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_blocks_map_down() {
        assert_eq!(BlockPos::new(-1, 0, 15).chunk(), ChunkCoord::new(-1, 0, 0));
        assert_eq!(BlockPos::new(-16, -17, 16).chunk(), ChunkCoord::new(-1, -2, 1));
        assert_eq!(BlockPos::new(-1, -1, -1).local(), [15, 15, 15]);
    }

    #[test]
    fn test_origin_block_roundtrip() {
        let coord = ChunkCoord::new(-3, 2, 7);
        let origin = coord.origin_block();
        assert_eq!(origin.chunk(), coord);
        assert_eq!(origin.local(), [0, 0, 0]);
        assert_eq!(origin.offset(15, 15, 15).chunk(), coord);
        assert_eq!(origin.offset(16, 0, 0).chunk(), coord.offset(1, 0, 0));
    }

    #[test]
    fn test_distance_squared() {
        let a = ChunkCoord::new(5, 0, 0);
        assert_eq!(a.distance_squared(ChunkCoord::ORIGIN), 25);
        assert_eq!(ChunkCoord::new(1, -1, 1).distance_squared(ChunkCoord::ORIGIN), 3);
    }

    #[test]
    fn test_face_neighbors_are_adjacent() {
        let center = ChunkCoord::new(2, -4, 9);
        for n in center.face_neighbors() {
            assert_eq!(n.distance_squared(center), 1);
        }
    }

    #[test]
    fn test_world_position_to_chunk() {
        // 16 blocks of 0.1 make one chunk edge of 1.6
        let coord = ChunkCoord::from_world_position(Vec3::new(1.7, -0.05, 0.0), 0.1);
        assert_eq!(coord, ChunkCoord::new(1, -1, 0));
    }

    #[test]
    fn test_local_index_layout() {
        assert_eq!(local_index(1, 0, 0), 1);
        assert_eq!(local_index(0, 1, 0), CHUNK_DIM);
        assert_eq!(local_index(0, 0, 1), CHUNK_DIM * CHUNK_DIM);
    }
}
