//! Management thread: turns observer movement into load and unload work.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use strata_core::ChunkState;
use strata_shared::{ChunkCoord, StreamingConfig};

use crate::shared::Shared;
use crate::table::ChunkTable;

/// Work derived from one observer position.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StreamPlan {
    /// Tracked coordinates past the unload distance.
    pub unload: Vec<ChunkCoord>,
    /// Newly wanted coordinates, nearest first. Already marked `Backlog`.
    pub load: Vec<ChunkCoord>,
}

/// Computes the unload and load sets around `center`.
///
/// Every coordinate in the load set moves to `Backlog` before this returns,
/// so a second plan for the same center loads nothing.
pub fn plan(table: &mut ChunkTable, center: ChunkCoord, config: &StreamingConfig) -> StreamPlan {
    let unload_distance = config.unload_distance_squared();
    let mut unload: Vec<ChunkCoord> = table
        .states
        .keys()
        .copied()
        .filter(|coord| coord.distance_squared(center) > unload_distance)
        .collect();
    unload.sort_unstable();

    let rd = config.render_distance;
    let load_distance = config.load_distance_squared();
    let mut load = Vec::new();
    for dy in -rd..=rd {
        let y = center.y + dy;
        if !config.vertical_range.contains(y) {
            continue;
        }
        for dz in -rd..=rd {
            for dx in -rd..=rd {
                let coord = center.offset(dx, dy, dz);
                if coord.distance_squared(center) > load_distance
                    || table.state(coord) != ChunkState::Undefined
                {
                    continue;
                }
                table.set_state(coord, ChunkState::Backlog);
                load.push(coord);
            }
        }
    }
    load.sort_unstable_by_key(|coord| (coord.distance_squared(center), *coord));

    StreamPlan { unload, load }
}

/// Thread body. Returns when the position queue shuts down.
pub(crate) fn run(shared: &Arc<Shared>) {
    tracing::debug!("management thread started");
    while let Some(mut center) = shared.positions.pop_blocking() {
        // Only the latest position matters
        while let Some(newer) = shared.positions.try_pop() {
            center = newer;
        }
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }

        let plan = plan(&mut shared.table.lock(), center, &shared.config);
        tracing::debug!(
            "observer at {}: {} to load, {} to unload",
            center,
            plan.load.len(),
            plan.unload.len()
        );

        for coord in plan.unload {
            if shared.unloads.push(coord).is_err() {
                return;
            }
        }
        for coord in plan.load {
            if shared.generation.push(coord).is_err() {
                return;
            }
        }
    }
    tracing::debug!("management thread stopped");
}
