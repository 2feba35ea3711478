//! Meshing worker pool.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use strata_meshing::{GreedyMesher, NeighborSnapshot};
use strata_shared::BlockRegistry;

use crate::shared::{MeshResult, Shared};

/// Worker body. Returns on shutdown.
///
/// Requests for chunks that were unloaded or replaced since they were
/// queued are skipped without producing a result.
pub(crate) fn run(index: usize, shared: &Arc<Shared>, registry: &BlockRegistry) {
    let mut mesher = GreedyMesher::new();
    let mut meshed = 0u64;

    while let Some(request) = shared.mesh_requests.pop_blocking() {
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }

        let captured = {
            let table = shared.table.lock();
            table
                .entry(request.coord)
                .filter(|entry| entry.chunk.id() == request.id)
                .map(|entry| {
                    let neighbors = NeighborSnapshot::capture(request.coord, |c| table.chunk(c));
                    (Arc::clone(&entry.chunk), neighbors)
                })
        };
        let Some((chunk, neighbors)) = captured else {
            tracing::trace!("worker {}: chunk {} gone, skipping", index, request.coord);
            continue;
        };

        let mesh = mesher.mesh(&chunk, registry, &neighbors);
        meshed += 1;
        let result = MeshResult {
            coord: request.coord,
            id: request.id,
            mesh,
        };
        if shared.mesh_results.push(result).is_err() {
            break;
        }
    }
    tracing::debug!("mesh worker {} stopped after {} chunks", index, meshed);
}
