//! Chunk lifecycle states.

/// Where a chunk coordinate is in the streaming pipeline.
///
/// ```text
/// Undefined -> Backlog -> GpuPending -> PboPending -> DataReady -> MeshPending -> Ready
///                                                                     ^            |
///                                                                     +-- remesh --+
/// ```
///
/// `Undefined` is never stored: a coordinate without an entry in the state
/// map is undefined. Any state may return to `Undefined` on unload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChunkState {
    /// Not tracked.
    #[default]
    Undefined,
    /// Queued for terrain generation.
    Backlog,
    /// Compute job dispatched, waiting on its fence.
    GpuPending,
    /// Device-to-host copy scheduled, waiting on its fence.
    PboPending,
    /// Block data read back and stored in the chunk table.
    DataReady,
    /// Queued for (or being processed by) a meshing worker.
    MeshPending,
    /// Geometry uploaded and drawable.
    Ready,
}

impl ChunkState {
    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (_, Self::Undefined)
                | (Self::Undefined, Self::Backlog)
                | (Self::Backlog, Self::GpuPending)
                | (Self::GpuPending, Self::PboPending)
                | (Self::PboPending, Self::DataReady)
                | (Self::DataReady | Self::Ready, Self::MeshPending)
                | (Self::MeshPending, Self::Ready)
        )
    }

    /// Whether a GPU job or transfer for this coordinate is in flight.
    #[must_use]
    pub const fn is_generating(self) -> bool {
        matches!(self, Self::GpuPending | Self::PboPending)
    }

    /// Whether the chunk table holds block data for this coordinate.
    #[must_use]
    pub const fn has_data(self) -> bool {
        matches!(self, Self::DataReady | Self::MeshPending | Self::Ready)
    }

    /// Short name for logs and statistics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Backlog => "backlog",
            Self::GpuPending => "gpu_pending",
            Self::PboPending => "pbo_pending",
            Self::DataReady => "data_ready",
            Self::MeshPending => "mesh_pending",
            Self::Ready => "ready",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cannot_skip_states() {
        assert!(ChunkState::Undefined.can_advance_to(ChunkState::Backlog));
        assert!(!ChunkState::Undefined.can_advance_to(ChunkState::GpuPending));
        assert!(!ChunkState::Backlog.can_advance_to(ChunkState::PboPending));
        assert!(!ChunkState::GpuPending.can_advance_to(ChunkState::Ready));
        assert!(!ChunkState::DataReady.can_advance_to(ChunkState::Ready));
    }

    #[test]
    fn test_remesh_and_unload() {
        assert!(ChunkState::Ready.can_advance_to(ChunkState::MeshPending));
        assert!(ChunkState::PboPending.can_advance_to(ChunkState::Undefined));
        assert!(ChunkState::Ready.can_advance_to(ChunkState::Undefined));
    }
}
