//! # Chunk Geometry Constants
//!
//! **CRITICAL:** These values are baked into the compute shader.
//! Changing `CHUNK_DIM` requires updating `terrain.wgsl` as well.

// =============================================================================
// CHUNK DIMENSIONS
// =============================================================================

/// Blocks per chunk edge.
pub const CHUNK_DIM: usize = 16;

/// Blocks per chunk slice (`CHUNK_DIM²`).
pub const CHUNK_AREA: usize = CHUNK_DIM * CHUNK_DIM;

/// Blocks per chunk (`CHUNK_DIM³`).
pub const CHUNK_VOLUME: usize = CHUNK_AREA * CHUNK_DIM;

/// `CHUNK_DIM` as a signed integer for coordinate math.
pub const CHUNK_DIM_I32: i32 = CHUNK_DIM as i32;

// =============================================================================
// PIPELINE DEFAULTS
// =============================================================================

/// Default maximum number of chunks mid-generation on the GPU.
pub const MAX_CONCURRENT_JOBS: usize = 64;

/// Default maximum number of device-to-host transfers in flight.
pub const MAX_CONCURRENT_TRANSFERS: usize = 64;

/// Default render distance in chunks.
pub const DEFAULT_RENDER_DISTANCE: i32 = 16;

/// Extra ring of chunks kept alive beyond the render distance before unloading.
///
/// Stops chunks on the edge from thrashing when the observer jitters across
/// a chunk border.
pub const UNLOAD_MARGIN: i32 = 2;

/// Default world-space edge length of one block.
pub const DEFAULT_BLOCK_SIZE: f32 = 0.1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_consistent() {
        assert_eq!(CHUNK_VOLUME, CHUNK_DIM * CHUNK_DIM * CHUNK_DIM);
        assert!(CHUNK_DIM.is_power_of_two());
    }
}
