//! # STRATA Shared
//!
//! Common types used by every stage of the chunk streaming pipeline.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - `wgpu`
//! - Any GPU or window-related crate
//!
//! If you need graphics types, put them in `strata_rendering`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod block;
pub mod config;
pub mod constants;
pub mod coords;
pub mod error;
pub mod math;

pub use block::{BlockProperties, BlockRegistry, BlockType};
pub use config::{StreamingConfig, VerticalRange};
pub use constants::{CHUNK_AREA, CHUNK_DIM, CHUNK_VOLUME};
pub use coords::{BlockPos, ChunkCoord};
pub use error::{ConfigError, ConfigResult};
pub use math::{Aabb, Vec3};
