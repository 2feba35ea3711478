//! # Value Noise
//!
//! Lattice value noise with smoothstep interpolation, summed into fractal
//! Brownian motion.
//!
//! ## Why value noise over simplex?
//!
//! - The compute shader needs the exact same lattice values. A 32-bit
//!   integer hash ports to WGSL without tables or 64-bit math.
//! - Terrain height only needs a smooth 2D field.
//!
//! ## Determinism Guarantee
//!
//! Given the same `WorldSeed`, lattice values are identical on any platform.

use serde::Deserialize;

/// World seed for deterministic generation.
///
/// All procedural generation derives from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives a sub-seed for a specific purpose.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut hash = self.0;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }

    /// Folds the seed to the 32 bits the shader works with.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn to_u32(self) -> u32 {
        (self.0 ^ (self.0 >> 32)) as u32
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0x5EED)
    }
}

/// Hashes a 2D lattice point.
///
/// Mirrors `hash2` in `terrain.wgsl`.
#[inline]
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn hash2(seed: u32, x: i32, z: i32) -> u32 {
    let mut h = seed
        ^ (x as u32).wrapping_mul(0x27d4_eb2d)
        ^ (z as u32).wrapping_mul(0x1656_67b1);
    h = (h ^ (h >> 15)).wrapping_mul(0x2c1b_3c6d);
    h = (h ^ (h >> 12)).wrapping_mul(0x297a_2d39);
    h ^ (h >> 15)
}

/// Lattice value in `[0, 1)`.
#[inline]
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn lattice(seed: u32, x: i32, z: i32) -> f32 {
    // Top 24 bits are exactly representable in an f32 mantissa
    (hash2(seed, x, z) >> 8) as f32 / 16_777_216.0
}

#[inline]
fn smooth(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Seeded 2D value noise.
#[derive(Clone, Copy, Debug)]
pub struct ValueNoise {
    seed: u32,
}

impl ValueNoise {
    /// Creates a noise field from a seed.
    #[must_use]
    pub const fn new(seed: WorldSeed) -> Self {
        Self {
            seed: seed.to_u32(),
        }
    }

    /// The 32-bit seed uploaded to the shader.
    #[must_use]
    pub const fn gpu_seed(&self) -> u32 {
        self.seed
    }

    /// Samples the field, returning a value in `[0, 1)`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn sample(&self, x: f32, z: f32) -> f32 {
        let x0 = x.floor();
        let z0 = z.floor();
        let tx = smooth(x - x0);
        let tz = smooth(z - z0);
        let (ix, iz) = (x0 as i32, z0 as i32);

        let a = lattice(self.seed, ix, iz);
        let b = lattice(self.seed, ix + 1, iz);
        let c = lattice(self.seed, ix, iz + 1);
        let d = lattice(self.seed, ix + 1, iz + 1);
        lerp(lerp(a, b, tx), lerp(c, d, tx), tz)
    }

    /// Fractal Brownian motion: `octaves` layers, each at double frequency
    /// and half amplitude. Normalized to `[0, 1)`.
    #[must_use]
    pub fn fbm(&self, x: f32, z: f32, octaves: u32) -> f32 {
        let mut sum = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut norm = 0.0;
        for _ in 0..octaves.max(1) {
            sum += self.sample(x * frequency, z * frequency) * amplitude;
            norm += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }
        sum / norm
    }
}
