//! Greedy meshing for chunk geometry.
//!
//! Reduces triangle count by merging adjacent faces of the same block type
//! into larger rectangles.
//!
//! ## Algorithm
//!
//! 1. For each axis (X, Y, Z) and direction (+/-):
//! 2. Sweep through slices perpendicular to that axis
//! 3. Build a 2D mask of visible faces
//! 4. Greedily merge same-type cells: widest run along U first, then grow
//!    along V while the whole run still matches
//! 5. Emit one quad (4 vertices, 6 indices) per merged rectangle
//!
//! Step 4 is the row-first heuristic, not an optimal rectangle cover. It is
//! fast and good enough; keep it.
//!
//! ## Face visibility
//!
//! A face is emitted from block `b` toward neighbor `n` iff `b` is not air
//! and either `n` is air, or `n` is non-opaque while `b` is opaque. Faces
//! between two transparent blocks are never emitted, and an opaque block
//! next to water owns the shared face.

use strata_core::Chunk;
use strata_shared::{BlockRegistry, BlockType, CHUNK_AREA, CHUNK_DIM};

use crate::mesh::{ChunkMesh, ChunkVertex, MeshData};
use crate::query::WorldQuery;

/// Quad winding for faces looking down the positive axis.
const POSITIVE_WINDING: [u32; 6] = [0, 1, 2, 0, 2, 3];
/// Quad winding for faces looking down the negative axis.
const NEGATIVE_WINDING: [u32; 6] = [0, 2, 1, 0, 3, 2];

/// Greedy meshing engine.
///
/// Keeps its slice mask between calls so a worker thread meshes chunk after
/// chunk without reallocating.
pub struct GreedyMesher {
    /// Face mask for the current slice, indexed `[v * CHUNK_DIM + u]`.
    mask: Box<[BlockType]>,
}

impl GreedyMesher {
    /// Creates a mesher with its scratch memory allocated.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mask: vec![BlockType::AIR; CHUNK_AREA].into_boxed_slice(),
        }
    }

    /// Meshes a chunk.
    ///
    /// Lookups past the chunk border go through `world`; anything it does
    /// not know reads as air.
    pub fn mesh(
        &mut self,
        chunk: &Chunk,
        registry: &BlockRegistry,
        world: &impl WorldQuery,
    ) -> ChunkMesh {
        let mut mesh = ChunkMesh::default();
        self.mesh_into(chunk, registry, world, &mut mesh);
        mesh
    }

    /// Meshes a chunk into existing buffers, clearing them first.
    pub fn mesh_into(
        &mut self,
        chunk: &Chunk,
        registry: &BlockRegistry,
        world: &impl WorldQuery,
        out: &mut ChunkMesh,
    ) {
        out.opaque.clear();
        out.transparent.clear();

        // Faces only ever come from non-air blocks
        if chunk.is_empty() {
            return;
        }

        self.mesh_axis::<0>(chunk, registry, world, out);
        self.mesh_axis::<1>(chunk, registry, world, out);
        self.mesh_axis::<2>(chunk, registry, world, out);
    }

    /// Meshes both directions of one axis.
    fn mesh_axis<const AXIS: usize>(
        &mut self,
        chunk: &Chunk,
        registry: &BlockRegistry,
        world: &impl WorldQuery,
        out: &mut ChunkMesh,
    ) {
        for positive in [true, false] {
            for slice in 0..CHUNK_DIM {
                self.build_mask::<AXIS>(chunk, registry, world, slice, positive);
                self.greedy_extract::<AXIS>(registry, slice, positive, out);
            }
        }
    }

    /// Builds the visible-face mask of one slice.
    fn build_mask<const AXIS: usize>(
        &mut self,
        chunk: &Chunk,
        registry: &BlockRegistry,
        world: &impl WorldQuery,
        slice: usize,
        positive: bool,
    ) {
        let (u_axis, v_axis) = ((AXIS + 1) % 3, (AXIS + 2) % 3);
        let origin = chunk.coord().origin_block();

        for v in 0..CHUNK_DIM {
            for u in 0..CHUNK_DIM {
                let mut pos = [0usize; 3];
                pos[AXIS] = slice;
                pos[u_axis] = u;
                pos[v_axis] = v;

                let current = chunk.get(pos[0], pos[1], pos[2]);
                let cell = &mut self.mask[v * CHUNK_DIM + u];
                *cell = BlockType::AIR;
                if current.is_air() {
                    continue;
                }

                let neighbor = if positive && slice + 1 < CHUNK_DIM {
                    let mut n = pos;
                    n[AXIS] += 1;
                    chunk.get(n[0], n[1], n[2])
                } else if !positive && slice > 0 {
                    let mut n = pos;
                    n[AXIS] -= 1;
                    chunk.get(n[0], n[1], n[2])
                } else {
                    // Chunk border - ask the world
                    let mut offset = to_i32(pos);
                    offset[AXIS] += if positive { 1 } else { -1 };
                    world.block_at(origin.offset(offset[0], offset[1], offset[2]))
                };

                let visible = neighbor.is_air()
                    || (!registry.is_opaque(neighbor) && registry.is_opaque(current));
                if visible {
                    *cell = current;
                }
            }
        }
    }

    /// Greedily extracts quads from the mask.
    fn greedy_extract<const AXIS: usize>(
        &mut self,
        registry: &BlockRegistry,
        slice: usize,
        positive: bool,
        out: &mut ChunkMesh,
    ) {
        for v in 0..CHUNK_DIM {
            let mut u = 0;
            while u < CHUNK_DIM {
                let block = self.mask[v * CHUNK_DIM + u];
                if block.is_air() {
                    u += 1;
                    continue;
                }

                // Find width - extend as far as possible with the same type
                let mut width = 1;
                while u + width < CHUNK_DIM && self.mask[v * CHUNK_DIM + u + width] == block {
                    width += 1;
                }

                // Find height - extend rows with a matching run
                let mut height = 1;
                'height: while v + height < CHUNK_DIM {
                    let row = (v + height) * CHUNK_DIM;
                    for du in 0..width {
                        if self.mask[row + u + du] != block {
                            break 'height;
                        }
                    }
                    height += 1;
                }

                let target = if registry.is_opaque(block) {
                    &mut out.opaque
                } else {
                    &mut out.transparent
                };
                emit_quad::<AXIS>(target, registry, block, slice, positive, [u, v], [width, height]);

                // Clear used cells from mask
                for dv in 0..height {
                    let row = (v + dv) * CHUNK_DIM;
                    self.mask[row + u..row + u + width].fill(BlockType::AIR);
                }

                u += width;
            }
        }
    }
}

impl Default for GreedyMesher {
    fn default() -> Self {
        Self::new()
    }
}

/// Meshes a chunk with a throwaway mesher.
pub fn mesh_chunk(chunk: &Chunk, registry: &BlockRegistry, world: &impl WorldQuery) -> ChunkMesh {
    GreedyMesher::new().mesh(chunk, registry, world)
}

#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
fn to_i32(pos: [usize; 3]) -> [i32; 3] {
    pos.map(|c| c as i32)
}

/// Appends one merged rectangle.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn emit_quad<const AXIS: usize>(
    target: &mut MeshData,
    registry: &BlockRegistry,
    block: BlockType,
    slice: usize,
    positive: bool,
    [u, v]: [usize; 2],
    [width, height]: [usize; 2],
) {
    let (u_axis, v_axis) = ((AXIS + 1) % 3, (AXIS + 2) % 3);
    let props = registry.properties(block);

    let mut origin = [0.0f32; 3];
    origin[AXIS] = (slice + usize::from(positive)) as f32;
    origin[u_axis] = u as f32;
    origin[v_axis] = v as f32;

    let mut du = [0.0f32; 3];
    du[u_axis] = width as f32;
    let mut dv = [0.0f32; 3];
    dv[v_axis] = height as f32;

    let mut normal = [0.0f32; 3];
    normal[AXIS] = if positive { 1.0 } else { -1.0 };

    let corners = [
        origin,
        add(origin, du),
        add(add(origin, du), dv),
        add(origin, dv),
    ];

    let base = target.vertices.len() as u32;
    target.vertices.extend(corners.iter().map(|&position| ChunkVertex {
        position,
        normal,
        color: props.color,
        texture_layer: props.texture_layer,
    }));
    let winding = if positive {
        POSITIVE_WINDING
    } else {
        NEGATIVE_WINDING
    };
    target.indices.extend(winding.iter().map(|i| base + i));
}

#[inline]
fn add(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}
