//! # Rendering Error Types

use thiserror::Error;

/// Buffer-pool allocation failures.
///
/// Both variants mean the pool configuration is too small for the world
/// being streamed. Callers log them and keep an invalid allocation so the
/// chunk is simply not drawn.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// A single mesh does not fit in an empty pool.
    #[error(
        "mesh of {vertices} vertices / {indices} indices exceeds pool capacity \
         of {vertex_capacity} / {index_capacity}"
    )]
    RequestTooLarge {
        /// Vertices requested.
        vertices: usize,
        /// Indices requested.
        indices: usize,
        /// Vertices per pool.
        vertex_capacity: u32,
        /// Indices per pool.
        index_capacity: u32,
    },

    /// Every pool is full and the pool limit has been reached.
    #[error("all {pools} buffer pools are full")]
    Exhausted {
        /// Number of pools in use.
        pools: usize,
    },
}

/// Graphics device failures.
#[derive(Error, Debug)]
pub enum GpuError {
    /// No adapter matched the request.
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    /// The adapter lacks something chunk rendering needs.
    #[error("adapter does not support {feature}")]
    MissingFeature {
        /// What is missing.
        feature: &'static str,
    },

    /// The adapter refused to create a device.
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    /// Mapping a transfer buffer for reading failed.
    #[error("failed to map transfer buffer {slot}")]
    MapFailed {
        /// Transfer slot that failed.
        slot: usize,
    },

    /// A transfer buffer was read before its copy finished.
    #[error("transfer buffer {slot} read before its fence signaled")]
    NotReady {
        /// Transfer slot read too early.
        slot: usize,
    },
}

/// Result type for allocation.
pub type AllocResult<T> = Result<T, AllocError>;
