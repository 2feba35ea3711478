//! State shared between the main thread and the background threads.

use std::sync::atomic::AtomicBool;

use parking_lot::Mutex;
use strata_core::{ChunkId, WorkQueue};
use strata_meshing::ChunkMesh;
use strata_shared::{ChunkCoord, StreamingConfig};

use crate::table::ChunkTable;

/// Request to mesh one incarnation of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MeshRequest {
    pub coord: ChunkCoord,
    pub id: ChunkId,
}

/// Finished geometry for one incarnation of a chunk.
#[derive(Debug)]
pub(crate) struct MeshResult {
    pub coord: ChunkCoord,
    pub id: ChunkId,
    pub mesh: ChunkMesh,
}

pub(crate) struct Shared {
    pub config: StreamingConfig,
    pub table: Mutex<ChunkTable>,
    /// Observer chunk, fed by the main thread when it changes.
    pub positions: WorkQueue<ChunkCoord>,
    /// Coordinates marked `Backlog`, nearest first per batch.
    pub generation: WorkQueue<ChunkCoord>,
    /// Coordinates past the unload distance.
    pub unloads: WorkQueue<ChunkCoord>,
    pub mesh_requests: WorkQueue<MeshRequest>,
    pub mesh_results: WorkQueue<MeshResult>,
    pub shutdown: AtomicBool,
}

impl Shared {
    pub fn new(config: StreamingConfig) -> Self {
        let capacity = config.queue_capacity;
        Self {
            table: Mutex::new(ChunkTable::default()),
            positions: WorkQueue::unbounded(),
            generation: WorkQueue::bounded(capacity),
            unloads: WorkQueue::bounded(capacity),
            mesh_requests: WorkQueue::bounded(capacity),
            mesh_results: WorkQueue::bounded(capacity),
            shutdown: AtomicBool::new(false),
            config,
        }
    }

    /// Wakes every thread blocked on a queue.
    pub fn close_queues(&self) {
        self.positions.shutdown();
        self.generation.shutdown();
        self.unloads.shutdown();
        self.mesh_requests.shutdown();
        self.mesh_results.shutdown();
    }
}
