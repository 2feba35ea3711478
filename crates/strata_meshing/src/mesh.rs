//! Mesh output types.

use bytemuck::{Pod, Zeroable};

/// Vertices emitted per merged rectangle.
pub const VERTICES_PER_QUAD: usize = 4;

/// Indices emitted per merged rectangle (two triangles).
pub const INDICES_PER_QUAD: usize = 6;

/// One vertex of chunk geometry.
///
/// Positions are chunk-local, in block units. The renderer scales by the
/// block size and offsets by the chunk anchor.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ChunkVertex {
    /// Chunk-local position.
    pub position: [f32; 3],
    /// Face normal, one of the six axis directions.
    pub normal: [f32; 3],
    /// RGBA tint from the block type.
    pub color: [f32; 4],
    /// Layer in the block texture array.
    pub texture_layer: u32,
}

/// Indexed triangle list.
///
/// Indices are relative to this list's own vertices; the base vertex of the
/// buffer-pool allocation is applied at draw time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex list.
    pub vertices: Vec<ChunkVertex>,
    /// Triangle indices into `vertices`.
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Returns true if there is nothing to draw.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of quads emitted.
    #[inline]
    #[must_use]
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_QUAD
    }

    /// Vertex bytes for upload.
    #[must_use]
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index bytes for upload.
    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub(crate) fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }
}

/// Geometry for one chunk, split by opacity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMesh {
    /// Faces of opaque blocks. Drawn first with depth writes.
    pub opaque: MeshData,
    /// Faces of non-opaque blocks. Drawn back-to-front without depth writes.
    pub transparent: MeshData,
}

impl ChunkMesh {
    /// Returns true if neither pass has geometry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.transparent.is_empty()
    }

    /// Total quads across both passes.
    #[must_use]
    pub fn quad_count(&self) -> usize {
        self.opaque.quad_count() + self.transparent.quad_count()
    }
}
