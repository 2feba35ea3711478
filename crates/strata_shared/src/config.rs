//! Streaming configuration.
//!
//! Loaded once at startup and never changed while a world is running.
//! Every field has a default, so an empty TOML file is a valid configuration.

use std::path::Path;

use serde::Deserialize;

use crate::constants::{
    DEFAULT_BLOCK_SIZE, DEFAULT_RENDER_DISTANCE, MAX_CONCURRENT_JOBS, MAX_CONCURRENT_TRANSFERS,
    UNLOAD_MARGIN,
};
use crate::error::{ConfigError, ConfigResult};

/// Inclusive range of chunk Y coordinates that may exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VerticalRange {
    /// Lowest chunk layer.
    pub min: i32,
    /// Highest chunk layer.
    pub max: i32,
}

impl VerticalRange {
    /// Whether the layer `y` may hold chunks.
    #[inline]
    #[must_use]
    pub const fn contains(&self, y: i32) -> bool {
        y >= self.min && y <= self.max
    }
}

impl Default for VerticalRange {
    fn default() -> Self {
        Self { min: -2, max: 3 }
    }
}

/// Tunables for the chunk streaming pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Chunks within this distance of the observer are loaded.
    pub render_distance: i32,
    /// Chunk layers that exist at all.
    pub vertical_range: VerticalRange,
    /// Maximum chunks mid-generation on the GPU.
    pub max_concurrent_jobs: usize,
    /// Maximum device-to-host copies in flight.
    pub max_concurrent_transfers: usize,
    /// Vertices per buffer pool.
    pub pool_vertex_capacity: u32,
    /// Indices per buffer pool.
    pub pool_index_capacity: u32,
    /// Upper bound on the number of buffer pools.
    pub max_pools: usize,
    /// Meshing threads. `None` uses every hardware thread but one.
    pub mesh_workers: Option<usize>,
    /// Capacity of the cross-thread request queues.
    pub queue_capacity: usize,
    /// World-space edge length of one block.
    pub block_size: f32,
    /// Polls before a CPU-backend fence signals.
    pub cpu_generation_latency: u32,
    /// Terrain seed.
    pub seed: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            render_distance: DEFAULT_RENDER_DISTANCE,
            vertical_range: VerticalRange::default(),
            max_concurrent_jobs: MAX_CONCURRENT_JOBS,
            max_concurrent_transfers: MAX_CONCURRENT_TRANSFERS,
            pool_vertex_capacity: 1 << 20,
            pool_index_capacity: 3 << 19,
            max_pools: 64,
            mesh_workers: None,
            queue_capacity: 4096,
            block_size: DEFAULT_BLOCK_SIZE,
            cpu_generation_latency: 1,
            seed: 0x5EED,
        }
    }
}

impl StreamingConfig {
    /// Parses and validates a configuration from TOML.
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML or out-of-range values.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, does not parse, or is invalid.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!(
            "loaded streaming config from {} (render distance {})",
            path.display(),
            config.render_distance
        );
        Ok(config)
    }

    /// Rejects values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> ConfigResult<()> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigResult<()> {
            Err(ConfigError::InvalidValue {
                field,
                reason: reason.into(),
            })
        }

        if self.render_distance < 0 {
            return invalid("render_distance", "must not be negative");
        }
        if self.vertical_range.min > self.vertical_range.max {
            return invalid("vertical_range", "min must not exceed max");
        }
        if self.max_concurrent_jobs == 0 {
            return invalid("max_concurrent_jobs", "must be at least 1");
        }
        if self.max_concurrent_transfers == 0 {
            return invalid("max_concurrent_transfers", "must be at least 1");
        }
        if self.pool_vertex_capacity == 0 || self.pool_index_capacity == 0 {
            return invalid("pool_vertex_capacity", "pool capacities must be nonzero");
        }
        if self.max_pools == 0 {
            return invalid("max_pools", "must be at least 1");
        }
        if self.mesh_workers == Some(0) {
            return invalid("mesh_workers", "must be at least 1 when set");
        }
        if self.queue_capacity == 0 {
            return invalid("queue_capacity", "must be at least 1");
        }
        if !(self.block_size.is_finite() && self.block_size > 0.0) {
            return invalid("block_size", "must be a positive number");
        }
        Ok(())
    }

    /// Meshing thread count: the override, or hardware threads minus one.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.mesh_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map_or(1, |n| n.get().saturating_sub(1))
                .max(1)
        })
    }

    /// Squared chunk distance inside which chunks are loaded.
    #[must_use]
    pub fn load_distance_squared(&self) -> i64 {
        let rd = i64::from(self.render_distance);
        rd * rd
    }

    /// Squared chunk distance beyond which chunks are unloaded.
    #[must_use]
    pub fn unload_distance_squared(&self) -> i64 {
        let rd = i64::from(self.render_distance + UNLOAD_MARGIN);
        rd * rd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config = StreamingConfig::from_toml_str("").unwrap();
        assert_eq!(config, StreamingConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = StreamingConfig::from_toml_str(
            r"
            render_distance = 4
            mesh_workers = 2
            max_concurrent_jobs = 8

            [vertical_range]
            min = -1
            max = 1
            ",
        )
        .unwrap();
        assert_eq!(config.render_distance, 4);
        assert_eq!(config.worker_count(), 2);
        assert_eq!(config.max_concurrent_jobs, 8);
        assert_eq!(config.max_concurrent_transfers, MAX_CONCURRENT_TRANSFERS);
        assert!(config.vertical_range.contains(1));
        assert!(!config.vertical_range.contains(2));
        assert_eq!(config.load_distance_squared(), 16);
        assert_eq!(config.unload_distance_squared(), 36);
    }

    #[test]
    fn test_rejects_zero_jobs() {
        let err = StreamingConfig::from_toml_str("max_concurrent_jobs = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "max_concurrent_jobs",
                ..
            }
        ));
    }

    #[test]
    fn test_worker_count_at_least_one() {
        assert!(StreamingConfig::default().worker_count() >= 1);
    }
}
