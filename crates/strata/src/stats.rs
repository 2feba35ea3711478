//! Streaming statistics.

use std::fmt;

/// Snapshot of the pipeline, taken by [`World::stats`](crate::World::stats).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Coordinates waiting for a generation slot.
    pub backlog: usize,
    /// Coordinates with a compute job in flight.
    pub gpu_pending: usize,
    /// Coordinates with a read-back in flight.
    pub pbo_pending: usize,
    /// Coordinates with data waiting to be queued for meshing.
    pub data_ready: usize,
    /// Coordinates queued for or being meshed.
    pub mesh_pending: usize,
    /// Drawable coordinates.
    pub ready: usize,
    /// Generation jobs holding a storage slot.
    pub jobs_in_flight: usize,
    /// Read-backs holding a transfer slot.
    pub transfers_in_flight: usize,
    /// Buffer pools created.
    pub pools: usize,
    /// Live mesh allocations.
    pub allocations: usize,
    /// Vertex bytes in live allocations.
    pub vertex_bytes: u64,
    /// Index bytes in live allocations.
    pub index_bytes: u64,
    /// Calls to `step` so far.
    pub frames: u64,
    /// Late transfers and mesh results discarded.
    pub dropped_results: u64,
}

impl StreamStats {
    /// Every tracked coordinate.
    #[must_use]
    pub const fn tracked(&self) -> usize {
        self.backlog
            + self.gpu_pending
            + self.pbo_pending
            + self.data_ready
            + self.mesh_pending
            + self.ready
    }

    /// Whether any coordinate is still on its way to `Ready`.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.tracked() != self.ready
    }
}

impl fmt::Display for StreamStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ready {} | backlog {} gpu {} pbo {} data {} mesh {} | jobs {} transfers {} | \
             pools {} allocs {} ({} KiB) | dropped {}",
            self.ready,
            self.backlog,
            self.gpu_pending,
            self.pbo_pending,
            self.data_ready,
            self.mesh_pending,
            self.jobs_in_flight,
            self.transfers_in_flight,
            self.pools,
            self.allocations,
            (self.vertex_bytes + self.index_bytes) / 1024,
            self.dropped_results
        )
    }
}

/// Result of one [`World::render`](crate::World::render) call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Chunks that passed the visibility test.
    pub chunks_visible: u32,
    /// Chunks rejected by the camera.
    pub chunks_culled: u32,
    /// Pool binds issued.
    pub binds: u32,
    /// Indexed draws issued.
    pub draws: u32,
}
