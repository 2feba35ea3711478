//! # Height-Field Terrain
//!
//! Every column gets a surface height from fractal value noise. Blocks are
//! then chosen by depth below that surface:
//!
//! ```text
//!   above surface, at or below sea level  -> water
//!   above surface                         -> air
//!   surface (and 3 below) near sea level  -> sand
//!   surface                               -> grass
//!   3 blocks below surface                -> dirt
//!   deeper                                -> stone
//! ```

use serde::Deserialize;
use strata_shared::coords::local_index;
use strata_shared::{BlockPos, BlockType, ChunkCoord, CHUNK_DIM, CHUNK_VOLUME};

use crate::noise::{ValueNoise, WorldSeed};

/// Depth of the dirt (or sand) layer below the surface.
pub const TOPSOIL_DEPTH: i32 = 3;

/// Terrain shape parameters, shared with the compute shader uniform.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    /// World seed.
    pub seed: WorldSeed,
    /// Highest block layer filled with water.
    pub sea_level: i32,
    /// Surface height where the noise is zero.
    pub base_height: i32,
    /// Height added where the noise is one.
    pub amplitude: f32,
    /// Noise frequency in cycles per block.
    pub frequency: f32,
    /// Fractal octaves.
    pub octaves: u32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: WorldSeed::default(),
            sea_level: 4,
            base_height: -8,
            amplitude: 40.0,
            frequency: 1.0 / 96.0,
            octaves: 4,
        }
    }
}

impl TerrainParams {
    /// Default shape with a different seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: WorldSeed::new(seed),
            ..Self::default()
        }
    }
}

/// Deterministic terrain generator.
#[derive(Clone, Debug)]
pub struct TerrainGenerator {
    params: TerrainParams,
    noise: ValueNoise,
}

impl TerrainGenerator {
    /// Creates a generator.
    #[must_use]
    pub fn new(params: TerrainParams) -> Self {
        Self {
            noise: ValueNoise::new(params.seed.derive(0x7E44_A1)),
            params,
        }
    }

    /// Generator parameters.
    #[must_use]
    pub const fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// The 32-bit noise seed the shader must use.
    #[must_use]
    pub const fn gpu_seed(&self) -> u32 {
        self.noise.gpu_seed()
    }

    /// Surface block height of the column at `(x, z)`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        let p = &self.params;
        let n = self.noise.fbm(
            x as f32 * p.frequency,
            z as f32 * p.frequency,
            p.octaves,
        );
        p.base_height + (n * p.amplitude).floor() as i32
    }

    /// Block type at a world position given its column height.
    #[must_use]
    pub const fn block_for_height(&self, y: i32, height: i32) -> BlockType {
        let sea = self.params.sea_level;
        if y > height {
            if y <= sea {
                BlockType::WATER
            } else {
                BlockType::AIR
            }
        } else if height <= sea + 1 && y > height - TOPSOIL_DEPTH - 1 {
            BlockType::SAND
        } else if y == height {
            BlockType::GRASS
        } else if y >= height - TOPSOIL_DEPTH {
            BlockType::DIRT
        } else {
            BlockType::STONE
        }
    }

    /// Block type at a world position.
    #[must_use]
    pub fn block_at(&self, pos: BlockPos) -> BlockType {
        self.block_for_height(pos.y, self.height_at(pos.x, pos.z))
    }

    /// Fills `out` with the chunk's blocks in storage order.
    ///
    /// `out` must hold at least `CHUNK_VOLUME` entries; extra entries are
    /// left untouched.
    #[allow(clippy::cast_possible_wrap)]
    pub fn fill(&self, coord: ChunkCoord, out: &mut [BlockType]) {
        debug_assert!(out.len() >= CHUNK_VOLUME);
        let origin = coord.origin_block();
        for z in 0..CHUNK_DIM {
            for x in 0..CHUNK_DIM {
                let height = self.height_at(origin.x + x as i32, origin.z + z as i32);
                for y in 0..CHUNK_DIM {
                    let index = local_index(x, y, z);
                    if let Some(slot) = out.get_mut(index) {
                        *slot = self.block_for_height(origin.y + y as i32, height);
                    }
                }
            }
        }
    }

    /// Generates the chunk's blocks in storage order.
    #[must_use]
    pub fn generate(&self, coord: ChunkCoord) -> Vec<BlockType> {
        let mut blocks = vec![BlockType::AIR; CHUNK_VOLUME];
        self.fill(coord, &mut blocks);
        blocks
    }
}

impl Default for TerrainGenerator {
    fn default() -> Self {
        Self::new(TerrainParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let a = TerrainGenerator::new(TerrainParams::with_seed(99));
        let b = TerrainGenerator::new(TerrainParams::with_seed(99));
        let coord = ChunkCoord::new(3, 0, -7);
        assert_eq!(a.generate(coord), b.generate(coord));
    }

    #[test]
    fn test_layers_by_depth() {
        let gen = TerrainGenerator::default();
        let sea = gen.params().sea_level;
        // Well above the sea the surface is grass with dirt below
        let high = sea + 10;
        assert_eq!(gen.block_for_height(high, high), BlockType::GRASS);
        assert_eq!(gen.block_for_height(high - 1, high), BlockType::DIRT);
        assert_eq!(gen.block_for_height(high - TOPSOIL_DEPTH, high), BlockType::DIRT);
        assert_eq!(gen.block_for_height(high - TOPSOIL_DEPTH - 1, high), BlockType::STONE);
        assert_eq!(gen.block_for_height(high + 1, high), BlockType::AIR);
        // Below the sea the column is capped with sand and flooded
        let low = sea - 5;
        assert_eq!(gen.block_for_height(low, low), BlockType::SAND);
        assert_eq!(gen.block_for_height(low + 1, low), BlockType::WATER);
        assert_eq!(gen.block_for_height(sea + 1, low), BlockType::AIR);
    }

    #[test]
    fn test_fill_matches_block_at() {
        let gen = TerrainGenerator::default();
        let coord = ChunkCoord::new(-1, 0, 2);
        let blocks = gen.generate(coord);
        let origin = coord.origin_block();
        for &(x, y, z) in &[(0, 0, 0), (15, 15, 15), (3, 9, 12), (8, 0, 1)] {
            let pos = origin.offset(x, y, z);
            assert_eq!(blocks[pos.local_index()], gen.block_at(pos));
        }
    }

    #[test]
    fn test_deep_chunks_are_stone_and_sky_is_air() {
        let gen = TerrainGenerator::default();
        let deep = gen.generate(ChunkCoord::new(0, -10, 0));
        assert!(deep.iter().all(|&b| b == BlockType::STONE));
        let sky = gen.generate(ChunkCoord::new(0, 10, 0));
        assert!(sky.iter().all(|&b| b == BlockType::AIR));
    }
}
