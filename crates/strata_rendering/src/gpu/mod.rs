//! # wgpu Backends
//!
//! Device-backed implementations of [`TerrainBackend`](crate::jobs::TerrainBackend)
//! and [`MeshBufferBackend`](crate::allocator::MeshBufferBackend).

pub mod context;
pub mod mesh;
pub mod terrain;

pub use context::GpuContext;
pub use mesh::{
    chunk_vertex_layout, WgpuMeshBackend, WgpuMeshPool, CHUNK_PUSH_CONSTANTS, CHUNK_VERTEX_ATTRIBUTES,
};
pub use terrain::WgpuTerrainBackend;
