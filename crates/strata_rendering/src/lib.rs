//! # STRATA Rendering
//!
//! Device-facing half of the chunk streaming pipeline.
//!
//! ## Modules
//!
//! - [`allocator`]: buffer pools hosting every chunk mesh, with grow-on-demand
//! - [`jobs`]: terrain generation jobs and their non-blocking read-back
//! - [`fence`]: poll-only completion markers
//! - [`cpu`]: headless backends for tests and tools
//! - [`gpu`]: wgpu backends
//!
//! ## Threading
//!
//! Everything here belongs to the thread that owns the device. Worker
//! threads never touch these types; they exchange plain block and vertex
//! data through queues instead.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod allocator;
pub mod cpu;
pub mod error;
pub mod fence;
pub mod gpu;
pub mod jobs;

pub use allocator::{
    AllocatorStats, BufferBlock, BufferPool, BufferPoolAllocator, DrawSession, DrawTarget,
    MeshAllocation, MeshBufferBackend,
};
pub use cpu::{CpuFence, CpuMeshBackend, CpuMeshPool, CpuTerrainBackend, RecordedDraw, RecordingTarget};
pub use error::{AllocError, AllocResult, GpuError};
pub use fence::{Fence, SignalFence};
pub use jobs::{GpuJob, TerrainBackend, TerrainJobManager, TransferJob};
