//! # STRATA Meshing
//!
//! Turns chunk block data into indexed triangle lists.
//!
//! - [`GreedyMesher`]: slice-sweep greedy mesher with reusable scratch memory
//! - [`WorldQuery`]: read-only block lookups across chunk borders
//! - [`ChunkMesh`]: opaque and transparent geometry for one chunk

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod greedy;
pub mod mesh;
pub mod query;

pub use greedy::{mesh_chunk, GreedyMesher};
pub use mesh::{ChunkMesh, ChunkVertex, MeshData, INDICES_PER_QUAD, VERTICES_PER_QUAD};
pub use query::{EmptyWorld, NeighborSnapshot, WorldQuery};
