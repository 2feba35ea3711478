//! # Streaming Error Types

use strata_rendering::{AllocError, GpuError};
use strata_shared::ConfigError;
use thiserror::Error;

/// Errors raised while building or running a [`World`](crate::World).
///
/// Per-chunk failures never surface here; they are logged and the chunk
/// is skipped. These are the startup failures.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Invalid configuration or block palette.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Buffer pool misconfiguration.
    #[error("allocation error: {0}")]
    Alloc(#[from] AllocError),

    /// Graphics device unavailable.
    #[error("gpu error: {0}")]
    Gpu(#[from] GpuError),

    /// A pipeline thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        /// Thread name.
        name: String,
        /// OS error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
