//! # STRATA
//!
//! Asynchronous voxel chunk streaming.
//!
//! A [`World`] keeps the chunks around a moving observer generated, meshed
//! and resident in GPU buffer pools, without ever blocking the frame:
//!
//! ```text
//! Undefined -> Backlog -> GpuPending -> PboPending -> DataReady -> MeshPending -> Ready
//! ```
//!
//! ## Threads
//!
//! - **Management** (1): computes load/unload sets when the observer changes chunk
//! - **Meshing workers** (N): greedy-mesh chunk data
//! - **Owner** (caller): [`World::step`] once per frame, [`World::render`]
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use strata::{DistanceCamera, HeadlessWorld, RecordingTarget};
//! use strata_shared::{BlockRegistry, StreamingConfig, Vec3};
//!
//! let mut world = HeadlessWorld::headless(
//!     StreamingConfig::default(),
//!     Arc::new(BlockRegistry::builtin()),
//! )?;
//! world.set_observer_position(Vec3::ZERO);
//! world.step();
//!
//! let camera = DistanceCamera { position: Vec3::ZERO, radius: 50.0 };
//! let mut target = RecordingTarget::default();
//! world.render(&camera, &mut target);
//! # Ok::<(), strata::StreamError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod camera;
pub mod error;
pub mod management;
mod shared;
pub mod stats;
pub mod table;
mod workers;
pub mod world;

pub use camera::{Camera, DistanceCamera, FrustumCamera};
pub use error::{StreamError, StreamResult};
pub use stats::{DrawStats, StreamStats};
pub use world::{GpuWorld, HeadlessWorld, RenderChunk, World};

pub use strata_core::{ChunkId, ChunkState};
pub use strata_rendering::{DrawTarget, MeshAllocation, RecordingTarget};
