//! # STRATA Procedural Generation
//!
//! Deterministic terrain for the chunk streaming pipeline.
//!
//! ## Modules
//!
//! - [`noise`]: integer-hash value noise and fractal sums
//! - [`terrain`]: height-field terrain producing block arrays per chunk
//!
//! ## GPU Twin
//!
//! The GPU backend runs the same algorithm in `terrain.wgsl`. All hashing is
//! done on `u32` with wrapping arithmetic so both sides agree bit for bit on
//! lattice values. Only the final float interpolation may differ in the last
//! ulp between CPU and GPU.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod noise;
pub mod terrain;

pub use noise::{ValueNoise, WorldSeed};
pub use terrain::{TerrainGenerator, TerrainParams};
