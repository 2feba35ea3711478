//! The chunk table: block data, mesh allocations and lifecycle state.
//!
//! One instance lives behind the world's single mutex. Everything that
//! reads or writes it holds the lock only for map operations and `Arc`
//! clones, never for meshing or device work.

use std::collections::HashMap;
use std::sync::Arc;

use strata_core::{Chunk, ChunkState};
use strata_rendering::MeshAllocation;
use strata_shared::ChunkCoord;

/// A chunk with data, and the geometry it currently has on the device.
#[derive(Debug)]
pub struct ChunkEntry {
    /// Block data.
    pub chunk: Arc<Chunk>,
    /// Opaque geometry (invalid until meshed or when empty).
    pub opaque: MeshAllocation,
    /// Transparent geometry (invalid until meshed or when empty).
    pub transparent: MeshAllocation,
}

impl ChunkEntry {
    pub(crate) fn new(chunk: Arc<Chunk>) -> Self {
        Self {
            chunk,
            opaque: MeshAllocation::INVALID,
            transparent: MeshAllocation::INVALID,
        }
    }
}

/// Chunk entries plus the state of every tracked coordinate.
///
/// A coordinate missing from `states` is `Undefined`. Every coordinate in
/// `chunks` is also in `states`.
#[derive(Debug, Default)]
pub struct ChunkTable {
    pub(crate) chunks: HashMap<ChunkCoord, ChunkEntry>,
    pub(crate) states: HashMap<ChunkCoord, ChunkState>,
}

impl ChunkTable {
    /// Lifecycle state of a coordinate.
    #[must_use]
    pub fn state(&self, coord: ChunkCoord) -> ChunkState {
        self.states.get(&coord).copied().unwrap_or_default()
    }

    /// Moves a coordinate to a new state. `Undefined` forgets it.
    pub(crate) fn set_state(&mut self, coord: ChunkCoord, next: ChunkState) {
        debug_assert!(
            self.state(coord).can_advance_to(next),
            "illegal transition {} -> {} for chunk {}",
            self.state(coord).name(),
            next.name(),
            coord
        );
        if next == ChunkState::Undefined {
            self.states.remove(&coord);
        } else {
            self.states.insert(coord, next);
        }
    }

    /// Entry for a coordinate with block data.
    #[must_use]
    pub fn entry(&self, coord: ChunkCoord) -> Option<&ChunkEntry> {
        self.chunks.get(&coord)
    }

    /// Block data of a coordinate, as a cheap clone.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        self.chunks.get(&coord).map(|entry| Arc::clone(&entry.chunk))
    }

    /// Number of tracked coordinates.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.states.len()
    }

    /// Number of coordinates in `state`.
    #[must_use]
    pub fn count(&self, state: ChunkState) -> usize {
        self.states.values().filter(|s| **s == state).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_is_absent() {
        let mut table = ChunkTable::default();
        let coord = ChunkCoord::new(3, -1, 2);
        assert_eq!(table.state(coord), ChunkState::Undefined);
        table.set_state(coord, ChunkState::Backlog);
        assert_eq!(table.tracked(), 1);
        table.set_state(coord, ChunkState::Undefined);
        assert_eq!(table.tracked(), 0);
    }

    #[test]
    #[should_panic(expected = "illegal transition")]
    #[cfg(debug_assertions)]
    fn test_skipping_states_is_caught() {
        let mut table = ChunkTable::default();
        table.set_state(ChunkCoord::ORIGIN, ChunkState::Ready);
    }
}
